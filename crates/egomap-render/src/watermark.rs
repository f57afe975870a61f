//! Keyframe watermarks.
//!
//! Stamps each keyframe image with a small square in its map color and the
//! same rank number the map prints on its marker, so an agent looking at an
//! image can find it on the map and vice versa. The stamp sits in the
//! top-left corner, `inset` pixels from both edges.

use egomap_types::{FrameId, SpatialError};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::config::WatermarkConfig;
use crate::glyph::draw_number;
use crate::palette::ColorAssignment;

/// Overlays color/rank stamps onto keyframe images.
#[derive(Debug, Clone)]
pub struct Watermarker {
    config: WatermarkConfig,
}

impl Watermarker {
    /// Create a watermarker. Fails with [`SpatialError::InvalidConfig`] when
    /// the border leaves no room for the color fill.
    pub fn new(config: WatermarkConfig) -> Result<Self, SpatialError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Return stamped copies of `images`, in the same order.
    ///
    /// Inputs are left untouched. Fails with [`SpatialError::UnknownColor`]
    /// on the first frame id that `colors` does not know; in that case no
    /// image is returned.
    pub fn watermark(
        &self,
        images: &[(FrameId, RgbImage)],
        colors: &ColorAssignment,
    ) -> Result<Vec<RgbImage>, SpatialError> {
        images
            .iter()
            .map(|(frame_id, image)| self.stamp(*frame_id, image, colors))
            .collect()
    }

    /// Stamp a single image.
    pub fn stamp(
        &self,
        frame_id: FrameId,
        image: &RgbImage,
        colors: &ColorAssignment,
    ) -> Result<RgbImage, SpatialError> {
        let entry = colors.lookup(frame_id)?;
        let mut out = image.clone();
        if out.width() == 0 || out.height() == 0 {
            return Ok(out);
        }

        let cfg = &self.config;
        let ink = Rgb(cfg.ink);
        let origin = cfg.inset as i32;
        draw_filled_rect_mut(
            &mut out,
            Rect::at(origin, origin).of_size(cfg.size, cfg.size),
            ink,
        );
        let fill = cfg.size - 2 * cfg.border;
        let inner = origin + cfg.border as i32;
        draw_filled_rect_mut(
            &mut out,
            Rect::at(inner, inner).of_size(fill, fill),
            Rgb(entry.color),
        );
        let center = origin + (cfg.size / 2) as i32;
        draw_number(&mut out, (center, center), entry.rank, cfg.label_scale, ink);

        debug!(frame = %frame_id, rank = entry.rank, "keyframe image watermarked");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::KeyframeColor;

    const GREY: Rgb<u8> = Rgb([90, 90, 90]);

    fn colors() -> ColorAssignment {
        let mut c = ColorAssignment::new();
        c.insert(FrameId(3), KeyframeColor { rank: 1, color: [250, 140, 160] });
        c.insert(FrameId(8), KeyframeColor { rank: 2, color: [140, 210, 150] });
        c
    }

    fn marker() -> Watermarker {
        Watermarker::new(WatermarkConfig::default()).unwrap()
    }

    /// First fill pixel inside the dark border with the default config.
    fn fill_at(image: &RgbImage) -> Rgb<u8> {
        *image.get_pixel(7, 7)
    }

    #[test]
    fn output_matches_input_order_and_length() {
        let images = vec![
            (FrameId(8), RgbImage::from_pixel(64, 48, GREY)),
            (FrameId(3), RgbImage::from_pixel(32, 32, GREY)),
            (FrameId(8), RgbImage::from_pixel(40, 40, GREY)),
        ];
        let out = marker().watermark(&images, &colors()).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].dimensions(), (64, 48));
        assert_eq!(fill_at(&out[0]), Rgb([140, 210, 150]));
        assert_eq!(fill_at(&out[1]), Rgb([250, 140, 160]));
        assert_eq!(fill_at(&out[2]), Rgb([140, 210, 150]));
    }

    #[test]
    fn stamp_has_dark_border_and_leaves_rest_untouched() {
        let images = vec![(FrameId(3), RgbImage::from_pixel(64, 64, GREY))];
        let out = marker().watermark(&images, &colors()).unwrap();
        assert_eq!(*out[0].get_pixel(4, 4), Rgb([20, 20, 20]));
        assert_eq!(*out[0].get_pixel(3, 3), GREY);
        assert_eq!(*out[0].get_pixel(40, 40), GREY);
    }

    #[test]
    fn input_images_are_not_mutated() {
        let images = vec![(FrameId(3), RgbImage::from_pixel(32, 32, GREY))];
        let _ = marker().watermark(&images, &colors()).unwrap();
        assert!(images[0].1.pixels().all(|p| *p == GREY));
    }

    #[test]
    fn unknown_frame_fails() {
        let images = vec![
            (FrameId(3), RgbImage::from_pixel(32, 32, GREY)),
            (FrameId(5), RgbImage::from_pixel(32, 32, GREY)),
        ];
        let err = marker().watermark(&images, &colors()).unwrap_err();
        assert_eq!(err, SpatialError::UnknownColor(FrameId(5)));
    }

    #[test]
    fn tiny_and_empty_images_do_not_panic() {
        let images = vec![
            (FrameId(3), RgbImage::from_pixel(6, 6, GREY)),
            (FrameId(3), RgbImage::new(0, 0)),
        ];
        let out = marker().watermark(&images, &colors()).unwrap();
        assert_eq!(*out[0].get_pixel(5, 5), Rgb([20, 20, 20]));
        assert_eq!(out[1].dimensions(), (0, 0));
    }
}
