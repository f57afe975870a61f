//! Render and watermark configuration.
//!
//! Both structs deserialize with every field optional: anything missing takes
//! the default documented on the field. Validation happens once, when a
//! [`MapRenderer`][crate::map::MapRenderer] or
//! [`Watermarker`][crate::watermark::Watermarker] is constructed.

use egomap_types::SpatialError;
use serde::{Deserialize, Serialize};

/// Largest accepted side length, in pixels, of any drawn element.
pub const MAX_IMAGE_SIZE: u32 = 16_384;

/// Eight well-separated base colors, cycled by keyframe rank.
pub const DEFAULT_PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 200, 200],
    [240, 50, 230],
    [170, 110, 40],
];

// ────────────────────────────────────────────────────────────────────────────
// MapConfig
// ────────────────────────────────────────────────────────────────────────────

/// Geometry and styling of the egocentric map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Side length of the square output image in pixels. Default `256`.
    pub image_size: u32,
    /// Width of the frame drawn around the canvas. Default `8`.
    pub border_size: u32,
    /// Empty pixels kept between the farthest marker and the canvas edge.
    /// Default `10`.
    pub margin: u32,
    /// Half-width of a keyframe square (side is `2r + 1`). Default `6`.
    pub marker_radius: u32,
    /// Minimum gap between two keyframe squares after overlap resolution.
    /// Default `2`.
    pub marker_spacing: u32,
    /// Radius of the robot disc at the canvas center. Default `7`.
    pub robot_radius: u32,
    /// `k` in the `mean + k·std` outlier threshold. Default `2.0`.
    pub outlier_std_multiplier: f64,
    /// Outlier rejection is skipped below this many keyframes. Default `5`.
    pub min_outlier_samples: usize,
    /// Pixels per metre when there is nothing to scale against. Default `50.0`.
    pub default_scale: f64,
    /// Blend factor toward white applied to palette colors. Default `0.45`.
    pub lighten: f64,
    /// Pixel size of one font cell in map labels. Default `1`.
    pub label_scale: u32,
    /// Base colors, cycled by rank. Default [`DEFAULT_PALETTE`].
    pub palette: Vec<[u8; 3]>,
    /// Canvas fill. Default white.
    pub background: [u8; 3],
    /// Frame color around the canvas. Default light grey.
    pub border_color: [u8; 3],
    /// Outline, robot and label color. Default near-black.
    pub ink: [u8; 3],
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            image_size: 256,
            border_size: 8,
            margin: 10,
            marker_radius: 6,
            marker_spacing: 2,
            robot_radius: 7,
            outlier_std_multiplier: 2.0,
            min_outlier_samples: 5,
            default_scale: 50.0,
            lighten: 0.45,
            label_scale: 1,
            palette: DEFAULT_PALETTE.to_vec(),
            background: [255, 255, 255],
            border_color: [200, 200, 200],
            ink: [20, 20, 20],
        }
    }
}

impl MapConfig {
    /// Side length of the drawable canvas inside the border.
    pub fn canvas_size(&self) -> u32 {
        self.image_size.saturating_sub(self.border_size.saturating_mul(2))
    }

    /// Pixel coordinate of the canvas center (both axes).
    pub fn center(&self) -> i32 {
        (self.image_size / 2) as i32
    }

    /// Largest distance from the center, in pixels, at which a marker center
    /// may sit after scaling.
    pub fn usable_radius(&self) -> f64 {
        f64::from(self.canvas_size()) / 2.0 - f64::from(self.margin) - f64::from(self.marker_radius)
    }

    /// Inclusive pixel range a marker center may occupy on either axis so
    /// that the whole square stays inside the canvas.
    pub fn marker_bounds(&self) -> (i32, i32) {
        let r = self.marker_radius as i32;
        let lo = self.border_size as i32 + r;
        let hi = self.image_size as i32 - 1 - self.border_size as i32 - r;
        (lo, hi)
    }

    /// Center-to-center distance below which two markers count as colliding.
    pub fn marker_pitch(&self) -> i32 {
        let pitch = self
            .marker_radius
            .saturating_mul(2)
            .saturating_add(1)
            .saturating_add(self.marker_spacing);
        i32::try_from(pitch).unwrap_or(i32::MAX)
    }

    /// Reject configurations that cannot produce a meaningful map.
    pub fn validate(&self) -> Result<(), SpatialError> {
        let invalid = |msg: String| Err(SpatialError::InvalidConfig(msg));

        if self.image_size > MAX_IMAGE_SIZE {
            return invalid(format!(
                "image_size {} exceeds the {}px limit",
                self.image_size, MAX_IMAGE_SIZE
            ));
        }
        if self.image_size <= self.border_size.saturating_mul(2) {
            return invalid(format!(
                "image_size {} leaves no canvas inside a {}px border",
                self.image_size, self.border_size
            ));
        }
        if self.usable_radius() <= 0.0 {
            return invalid(format!(
                "canvas of {}px is too small for margin {} and marker_radius {}",
                self.canvas_size(),
                self.margin,
                self.marker_radius
            ));
        }
        if self.marker_radius < 3 {
            return invalid("marker_radius must be at least 3 to fit a label".to_string());
        }
        for (name, value) in [
            ("marker_spacing", self.marker_spacing),
            ("robot_radius", self.robot_radius),
            ("label_scale", self.label_scale),
        ] {
            if value >= self.image_size {
                return invalid(format!(
                    "{name} {value} must be smaller than image_size {}",
                    self.image_size
                ));
            }
        }
        if self.robot_radius == 0 {
            return invalid("robot_radius must be positive".to_string());
        }
        if self.label_scale == 0 {
            return invalid("label_scale must be positive".to_string());
        }
        if !(self.outlier_std_multiplier.is_finite() && self.outlier_std_multiplier > 0.0) {
            return invalid(format!(
                "outlier_std_multiplier must be positive, got {}",
                self.outlier_std_multiplier
            ));
        }
        if self.min_outlier_samples < 2 {
            return invalid("min_outlier_samples must be at least 2".to_string());
        }
        if !(self.default_scale.is_finite() && self.default_scale > 0.0) {
            return invalid(format!("default_scale must be positive, got {}", self.default_scale));
        }
        if !(0.0..=1.0).contains(&self.lighten) {
            return invalid(format!("lighten must lie in [0, 1], got {}", self.lighten));
        }
        if self.palette.is_empty() {
            return invalid("palette must contain at least one color".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// WatermarkConfig
// ────────────────────────────────────────────────────────────────────────────

/// Geometry and styling of the keyframe watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Side length of the stamped square, border included. Default `24`.
    pub size: u32,
    /// Width of the dark border around the square. Default `2`.
    pub border: u32,
    /// Distance from the top-left image corner. Default `4`.
    pub inset: u32,
    /// Pixel size of one font cell in the label. Default `2`.
    pub label_scale: u32,
    /// Border and label color. Default near-black.
    pub ink: [u8; 3],
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            size: 24,
            border: 2,
            inset: 4,
            label_scale: 2,
            ink: [20, 20, 20],
        }
    }
}

impl WatermarkConfig {
    /// Reject configurations that leave no room for the color fill.
    pub fn validate(&self) -> Result<(), SpatialError> {
        if self.size > MAX_IMAGE_SIZE || self.inset > MAX_IMAGE_SIZE {
            return Err(SpatialError::InvalidConfig(format!(
                "watermark size {} and inset {} must not exceed {}px",
                self.size, self.inset, MAX_IMAGE_SIZE
            )));
        }
        if self.size <= self.border.saturating_mul(2) {
            return Err(SpatialError::InvalidConfig(format!(
                "watermark size {} leaves no fill inside a {}px border",
                self.size, self.border
            )));
        }
        if self.label_scale == 0 || self.label_scale > self.size {
            return Err(SpatialError::InvalidConfig(format!(
                "watermark label_scale must lie in 1..={}, got {}",
                self.size, self.label_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MapConfig::default().validate().is_ok());
        assert!(WatermarkConfig::default().validate().is_ok());
    }

    #[test]
    fn default_geometry() {
        let cfg = MapConfig::default();
        assert_eq!(cfg.canvas_size(), 240);
        assert_eq!(cfg.center(), 128);
        assert!((cfg.usable_radius() - 104.0).abs() < 1e-12);
        assert_eq!(cfg.marker_bounds(), (14, 241));
        assert_eq!(cfg.marker_pitch(), 15);
        assert_eq!(cfg.palette.len(), 8);
    }

    #[test]
    fn border_swallowing_canvas_is_rejected() {
        let cfg = MapConfig {
            image_size: 16,
            border_size: 8,
            ..MapConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SpatialError::InvalidConfig(_))));
    }

    #[test]
    fn huge_border_is_rejected_without_overflow() {
        let cfg = MapConfig {
            border_size: u32::MAX / 2 + 1,
            ..MapConfig::default()
        };
        assert_eq!(cfg.canvas_size(), 0);
        assert!(matches!(cfg.validate(), Err(SpatialError::InvalidConfig(_))));

        let wm = WatermarkConfig {
            border: u32::MAX,
            ..WatermarkConfig::default()
        };
        assert!(matches!(wm.validate(), Err(SpatialError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let too_big = MapConfig {
            image_size: u32::MAX,
            ..MapConfig::default()
        };
        assert!(too_big.validate().unwrap_err().to_string().contains("limit"));

        let wide_spacing = MapConfig {
            marker_spacing: u32::MAX,
            ..MapConfig::default()
        };
        assert_eq!(wide_spacing.marker_pitch(), i32::MAX);
        assert!(wide_spacing.validate().is_err());

        let far_inset = WatermarkConfig {
            inset: u32::MAX,
            ..WatermarkConfig::default()
        };
        assert!(far_inset.validate().is_err());
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        let cfg = MapConfig {
            image_size: 48,
            ..MapConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("too small"), "{err}");
    }

    #[test]
    fn lighten_out_of_range_is_rejected() {
        let cfg = MapConfig {
            lighten: 1.5,
            ..MapConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_palette_is_rejected() {
        let cfg = MapConfig {
            palette: Vec::new(),
            ..MapConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_multiplier_is_rejected() {
        let cfg = MapConfig {
            outlier_std_multiplier: 0.0,
            ..MapConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: MapConfig = toml::from_str("image_size = 512\noutlier_std_multiplier = 3.0").unwrap();
        assert_eq!(cfg.image_size, 512);
        assert_eq!(cfg.outlier_std_multiplier, 3.0);
        assert_eq!(cfg.border_size, 8);
        assert_eq!(cfg.palette, DEFAULT_PALETTE.to_vec());
    }

    #[test]
    fn watermark_border_must_leave_fill() {
        let cfg = WatermarkConfig {
            size: 4,
            border: 2,
            ..WatermarkConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
