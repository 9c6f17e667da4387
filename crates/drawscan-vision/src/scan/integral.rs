// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Summed-area tables for O(1) windowed mean and variance.

use image::GrayImage;

/// Integral tables of pixel values and squared pixel values.
///
/// `sums[y * (width+1) + x]` holds the sum over the rectangle [0, 0) to
/// (x, y), exclusive on both axes; the tables carry a zero-padded border.
pub(crate) struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<u64>,
    squares: Vec<u64>,
}

impl IntegralImage {
    pub(crate) fn new(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let stride = (w + 1) as usize;
        let mut sums = vec![0u64; stride * (h + 1) as usize];
        let mut squares = vec![0u64; stride * (h + 1) as usize];

        for y in 0..h {
            let mut row_sum: u64 = 0;
            let mut row_sq: u64 = 0;
            for x in 0..w {
                let v = gray.get_pixel(x, y).0[0] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) as usize * stride + (x + 1) as usize;
                let above = y as usize * stride + (x + 1) as usize;
                sums[idx] = row_sum + sums[above];
                squares[idx] = row_sq + squares[above];
            }
        }

        Self {
            width: w,
            height: h,
            sums,
            squares,
        }
    }

    /// Clamped window bounds and pixel count around (cx, cy).
    fn window(&self, cx: u32, cy: u32, radius: u32) -> (usize, usize, usize, usize, f64) {
        let x1 = cx.saturating_sub(radius) as usize;
        let y1 = cy.saturating_sub(radius) as usize;
        let x2 = ((cx + radius + 1) as usize).min(self.width as usize);
        let y2 = ((cy + radius + 1) as usize).min(self.height as usize);
        let area = (x2.saturating_sub(x1) * y2.saturating_sub(y1)) as f64;
        (x1, y1, x2, y2, area)
    }

    fn lookup(table: &[u64], stride: usize, x1: usize, y1: usize, x2: usize, y2: usize) -> f64 {
        // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
        table[y2 * stride + x2] as f64 - table[y1 * stride + x2] as f64
            - table[y2 * stride + x1] as f64
            + table[y1 * stride + x1] as f64
    }

    /// Mean pixel value in the square window of `radius` centred on (cx, cy).
    pub(crate) fn region_mean(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let (x1, y1, x2, y2, area) = self.window(cx, cy, radius);
        if area == 0.0 {
            return 128.0;
        }
        let stride = (self.width + 1) as usize;
        Self::lookup(&self.sums, stride, x1, y1, x2, y2) / area
    }

    /// Population variance in the square window of `radius` centred on (cx, cy).
    pub(crate) fn region_variance(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let (x1, y1, x2, y2, area) = self.window(cx, cy, radius);
        if area == 0.0 {
            return 0.0;
        }
        let stride = (self.width + 1) as usize;
        let mean = Self::lookup(&self.sums, stride, x1, y1, x2, y2) / area;
        let mean_sq = Self::lookup(&self.squares, stride, x1, y1, x2, y2) / area;
        (mean_sq - mean * mean).max(0.0)
    }
}
