// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ink mask construction — inverted adaptive thresholding followed by a
// morphological opening that removes speckle.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;
use tracing::debug;

use crate::scan::integral::IntegralImage;

/// Mask value of an ink pixel.
pub const INK: u8 = 255;

/// Adaptive threshold with ink as foreground.
///
/// For each pixel the threshold is the mean intensity within a
/// `block_radius` neighbourhood minus `offset`. Pixels darker than their local
/// threshold become `INK` (255); all others become 0.
pub fn ink_mask(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = IntegralImage::new(gray);

    GrayImage::from_fn(width, height, |x, y| {
        let local_mean = integral.region_mean(x, y, block_radius);
        let threshold = (local_mean as i32 - offset).clamp(0, 255) as u8;
        let value = gray.get_pixel(x, y).0[0];
        Luma([if value < threshold { INK } else { 0 }])
    })
}

/// Ink mask with speckles smaller than the opening removed.
pub fn clean_ink_mask(
    gray: &GrayImage,
    block_radius: u32,
    offset: i32,
    opening_radius: u8,
) -> GrayImage {
    let mask = ink_mask(gray, block_radius, offset);
    if opening_radius == 0 {
        return mask;
    }
    let opened = open(&mask, Norm::LInf, opening_radius);
    debug!(opening_radius, "Speckle removed by opening");
    opened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_stroke_on_paper_becomes_ink() {
        let gray = GrayImage::from_fn(40, 40, |x, _| Luma([if (18..22).contains(&x) { 0 } else { 250 }]));
        let mask = ink_mask(&gray, 7, 10);
        assert_eq!(mask.get_pixel(20, 20).0[0], INK);
        assert_eq!(mask.get_pixel(5, 20).0[0], 0);
    }

    #[test]
    fn blank_paper_has_no_ink() {
        let gray = GrayImage::from_pixel(30, 30, Luma([240u8]));
        let mask = ink_mask(&gray, 15, 10);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn opening_removes_isolated_dots() {
        let mut gray = GrayImage::from_pixel(40, 40, Luma([250u8]));
        gray.put_pixel(10, 10, Luma([0]));
        for y in 25..32 {
            for x in 25..32 {
                gray.put_pixel(x, y, Luma([0]));
            }
        }
        let raw = ink_mask(&gray, 7, 10);
        assert_eq!(raw.get_pixel(10, 10).0[0], INK);

        let cleaned = clean_ink_mask(&gray, 7, 10, 1);
        assert_eq!(cleaned.get_pixel(10, 10).0[0], 0);
        assert_eq!(cleaned.get_pixel(28, 28).0[0], INK);
    }
}
