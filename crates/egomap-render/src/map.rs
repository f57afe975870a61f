//! Map Renderer.
//!
//! Rasterizes a [`MapLayout`] into a square RGB image:
//!
//! - a light frame of `border_size` pixels around a white canvas,
//! - the robot as a dark disc at the center with a wedge pointing up
//!   (camera forward),
//! - every drawn keyframe as a filled square in its palette color with a
//!   dark outline and its rank printed in the middle.
//!
//! Keyframes are painted after the robot so a keyframe captured where the
//! robot stands stays visible.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use egomap_geometry::RigidPose;
//! use egomap_render::{MapConfig, MapRenderer};
//! use egomap_types::FrameId;
//!
//! let renderer = MapRenderer::new(MapConfig::default()).unwrap();
//! let mut keyframes = BTreeMap::new();
//! keyframes.insert(FrameId(0), RigidPose::from_translation(0.0, 2.0, 0.0));
//!
//! let map = renderer.generate_map(&RigidPose::identity(), &keyframes);
//! assert_eq!(map.image.width(), 256);
//! assert_eq!(map.colors.lookup(FrameId(0)).unwrap().rank, 1);
//! ```

use std::collections::BTreeMap;

use egomap_geometry::RigidPose;
use egomap_types::{FrameId, SpatialError};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::info;

use crate::config::MapConfig;
use crate::glyph::draw_number;
use crate::layout::{MapLayout, layout_unchecked};
use crate::palette::ColorAssignment;

/// Output of one render pass.
#[derive(Debug, Clone)]
pub struct RenderedMap {
    /// The map raster.
    pub image: RgbImage,
    /// Color and rank of every drawn keyframe, for the watermarker.
    pub colors: ColorAssignment,
    /// Geometry behind the raster.
    pub layout: MapLayout,
}

/// Draws egocentric maps with a fixed, validated configuration.
#[derive(Debug, Clone)]
pub struct MapRenderer {
    config: MapConfig,
}

impl MapRenderer {
    /// Create a renderer. Fails with [`SpatialError::InvalidConfig`] when the
    /// configuration cannot produce a map.
    pub fn new(config: MapConfig) -> Result<Self, SpatialError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Render `keyframes` as seen from `current`.
    ///
    /// Each keyframe pose is trusted to have been validated on its way into
    /// the ledger; nothing is re-checked here and nothing can fail.
    pub fn generate_map(
        &self,
        current: &RigidPose,
        keyframes: &BTreeMap<FrameId, RigidPose>,
    ) -> RenderedMap {
        let layout = layout_unchecked(current, keyframes, &self.config);
        let image = self.draw(&layout);
        let colors = layout.colors();
        info!(
            keyframes = keyframes.len(),
            drawn = layout.markers.len(),
            outliers = layout.outliers.len(),
            scale = layout.scale,
            "map rendered"
        );
        RenderedMap {
            image,
            colors,
            layout,
        }
    }

    fn draw(&self, layout: &MapLayout) -> RgbImage {
        let cfg = &self.config;
        let ink = Rgb(cfg.ink);

        let mut image = RgbImage::from_pixel(cfg.image_size, cfg.image_size, Rgb(cfg.border_color));
        let canvas = cfg.canvas_size();
        draw_filled_rect_mut(
            &mut image,
            Rect::at(cfg.border_size as i32, cfg.border_size as i32).of_size(canvas, canvas),
            Rgb(cfg.background),
        );

        self.draw_robot(&mut image, layout.center, ink);

        let r = cfg.marker_radius as i32;
        let side = 2 * cfg.marker_radius + 1;
        for marker in &layout.markers {
            let [x, y] = marker.pixel;
            let square = Rect::at(x - r, y - r).of_size(side, side);
            draw_filled_rect_mut(&mut image, square, Rgb(marker.color));
            draw_hollow_rect_mut(&mut image, square, ink);
            draw_number(&mut image, (x, y), marker.rank, cfg.label_scale, ink);
        }
        image
    }

    fn draw_robot(&self, image: &mut RgbImage, center: [i32; 2], ink: Rgb<u8>) {
        let [cx, cy] = center;
        let r = self.config.robot_radius as i32;
        draw_filled_circle_mut(image, (cx, cy), r, ink);

        // Forward wedge just above the disc.
        let tip = cy - r - 6;
        let base = cy - r - 1;
        let wedge = [
            Point::new(cx, tip),
            Point::new(cx + 4, base),
            Point::new(cx - 4, base),
        ];
        draw_polygon_mut(image, &wedge, ink);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
