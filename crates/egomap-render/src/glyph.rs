//! Built-in 3×5 bitmap digits for rank labels.
//!
//! Labels only ever contain decimal digits, so a fixed pixel font keeps the
//! crate free of font files and makes label placement exact.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// One row per entry, most significant of the low three bits is the left
/// column.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Pixel `(width, height)` of `number` rendered at `scale`.
pub fn label_size(number: usize, scale: u32) -> (u32, u32) {
    let count = number.to_string().len() as u32;
    let width = count * GLYPH_WIDTH * scale + (count - 1) * scale;
    (width, GLYPH_HEIGHT * scale)
}

/// Draw `number` centred on `center`; pixels falling outside the image are
/// clipped.
pub fn draw_number(image: &mut RgbImage, center: (i32, i32), number: usize, scale: u32, color: Rgb<u8>) {
    if image.width() == 0 || image.height() == 0 || scale == 0 {
        return;
    }
    let (width, height) = label_size(number, scale);
    let x0 = center.0 - (width / 2) as i32;
    let y0 = center.1 - (height / 2) as i32;
    let advance = ((GLYPH_WIDTH + 1) * scale) as i32;
    let cell = scale as i32;

    for (i, ch) in number.to_string().bytes().enumerate() {
        let glyph = DIGITS[usize::from(ch - b'0')];
        let gx = x0 + i as i32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0b100 >> col) != 0 {
                    let rect = Rect::at(gx + col as i32 * cell, y0 + row as i32 * cell)
                        .of_size(scale, scale);
                    draw_filled_rect_mut(image, rect, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INK: Rgb<u8> = Rgb([0, 0, 0]);
    const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

    fn inked(image: &RgbImage) -> Vec<(u32, u32)> {
        image
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == INK)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn label_size_accounts_for_spacing() {
        assert_eq!(label_size(7, 1), (3, 5));
        assert_eq!(label_size(12, 1), (7, 5));
        assert_eq!(label_size(12, 2), (14, 10));
    }

    #[test]
    fn single_digit_is_centred() {
        let mut img = RgbImage::from_pixel(11, 11, PAPER);
        draw_number(&mut img, (5, 5), 8, 1, INK);
        let pixels = inked(&img);
        let xs: Vec<u32> = pixels.iter().map(|p| p.0).collect();
        let ys: Vec<u32> = pixels.iter().map(|p| p.1).collect();
        assert_eq!(*xs.iter().min().unwrap(), 4);
        assert_eq!(*xs.iter().max().unwrap(), 6);
        assert_eq!(*ys.iter().min().unwrap(), 3);
        assert_eq!(*ys.iter().max().unwrap(), 7);
    }

    #[test]
    fn digit_one_has_expected_pixel_count() {
        let mut img = RgbImage::from_pixel(9, 9, PAPER);
        draw_number(&mut img, (4, 4), 1, 1, INK);
        // 1 + 2 + 1 + 1 + 3 set bits.
        assert_eq!(inked(&img).len(), 8);
    }

    #[test]
    fn drawing_off_canvas_is_clipped() {
        let mut img = RgbImage::from_pixel(4, 4, PAPER);
        draw_number(&mut img, (0, 0), 88, 3, INK);
        assert!(!inked(&img).is_empty());
    }
}
