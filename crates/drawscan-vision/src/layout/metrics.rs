// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whole-sheet layout metrics computed over the binary ink mask and the
// detected structural elements.

use drawscan_core::QuadrantDensity;
use image::GrayImage;

/// Raw counts feeding the complexity score.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureCounts {
    pub contours: usize,
    pub hierarchy_depth: usize,
    pub horizontal_lines: usize,
    pub vertical_lines: usize,
    pub diagonal_lines: usize,
    pub text_regions: usize,
}

fn is_ink(mask: &GrayImage, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y).0[0] > 0
}

/// Mean of the left/right and top/bottom mirror agreement fractions.
///
/// An axis too short to fold (width or height below 2) counts as perfectly
/// symmetric along that axis.
pub fn symmetry_score(mask: &GrayImage) -> f64 {
    let (width, height) = mask.dimensions();

    let fold = |pairs: u64, matches: u64| {
        if pairs == 0 {
            1.0
        } else {
            matches as f64 / pairs as f64
        }
    };

    let mut lr_pairs = 0u64;
    let mut lr_matches = 0u64;
    for y in 0..height {
        for x in 0..width / 2 {
            lr_pairs += 1;
            if is_ink(mask, x, y) == is_ink(mask, width - 1 - x, y) {
                lr_matches += 1;
            }
        }
    }

    let mut tb_pairs = 0u64;
    let mut tb_matches = 0u64;
    for y in 0..height / 2 {
        for x in 0..width {
            tb_pairs += 1;
            if is_ink(mask, x, y) == is_ink(mask, x, height - 1 - y) {
                tb_matches += 1;
            }
        }
    }

    (fold(lr_pairs, lr_matches) + fold(tb_pairs, tb_matches)) / 2.0
}

/// Ink fraction per quadrant, split at the integer midpoints.
pub fn quadrant_density(mask: &GrayImage) -> QuadrantDensity {
    let (width, height) = mask.dimensions();
    let (mid_x, mid_y) = (width / 2, height / 2);

    let density = |x0: u32, y0: u32, x1: u32, y1: u32| {
        let area = u64::from(x1 - x0) * u64::from(y1 - y0);
        if area == 0 {
            return 0.0;
        }
        let ink = (y0..y1)
            .flat_map(|y| (x0..x1).map(move |x| (x, y)))
            .filter(|&(x, y)| is_ink(mask, x, y))
            .count();
        ink as f64 / area as f64
    };

    QuadrantDensity {
        top_left: density(0, 0, mid_x, mid_y),
        top_right: density(mid_x, 0, width, mid_y),
        bottom_left: density(0, mid_y, mid_x, height),
        bottom_right: density(mid_x, mid_y, width, height),
    }
}

/// Population standard deviation of consecutive gaps between sorted
/// positions. Fewer than two gaps carry no spread and yield 0.
pub fn gap_spread(positions: &[f64]) -> f64 {
    let mut sorted = positions.to_vec();
    sorted.sort_by(f64::total_cmp);

    let gaps: Vec<f64> = sorted.windows(2).map(|pair| pair[1] - pair[0]).collect();
    if gaps.is_empty() {
        return 0.0;
    }
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    variance.sqrt()
}

/// Product of `1 / (1 + spread/100)` over each position group.
pub fn layout_regularity(groups: &[&[f64]]) -> f64 {
    groups
        .iter()
        .map(|positions| 1.0 / (1.0 + gap_spread(positions) / 100.0))
        .product()
}

/// Weighted sum of normalised structure counts plus irregularity, in [0, 1].
///
/// Each normalised count is capped at 1 before weighting, so one saturated
/// count can contribute at most its own weight. This departs from clamping
/// only the final sum: 2000 contours alone score 0.15, not 0.30.
pub fn complexity_score(counts: &StructureCounts, regularity: f64) -> f64 {
    let term = |count: usize, scale: f64| (count as f64 / scale).min(1.0);

    let score = term(counts.contours, 1000.0) * 0.15
        + term(counts.hierarchy_depth, 10.0) * 0.10
        + term(counts.horizontal_lines, 50.0) * 0.15
        + term(counts.vertical_lines, 50.0) * 0.15
        + term(counts.diagonal_lines, 30.0) * 0.10
        + term(counts.text_regions, 100.0) * 0.20
        + (1.0 - regularity.clamp(0.0, 1.0)) * 0.15;

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn mirrored_mask_is_fully_symmetric() {
        let mut mask = GrayImage::new(10, 10);
        for y in 0..10 {
            mask.put_pixel(0, y, Luma([255]));
            mask.put_pixel(9, y, Luma([255]));
        }
        assert_eq!(symmetry_score(&mask), 1.0);
    }

    #[test]
    fn one_sided_ink_lowers_symmetry() {
        // Left half inked: every left/right pair disagrees, every
        // top/bottom pair agrees.
        let mut mask = GrayImage::new(10, 10);
        for y in 0..10 {
            for x in 0..5 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        assert!((symmetry_score(&mask) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_axes_count_as_symmetric() {
        let mask = GrayImage::from_pixel(1, 1, Luma([255]));
        assert_eq!(symmetry_score(&mask), 1.0);
    }

    #[test]
    fn density_per_quadrant() {
        let mut mask = GrayImage::new(10, 10);
        for y in 0..5 {
            for x in 0..5 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask.put_pixel(9, 9, Luma([255]));

        let density = quadrant_density(&mask);
        assert_eq!(density.top_left, 1.0);
        assert_eq!(density.top_right, 0.0);
        assert_eq!(density.bottom_left, 0.0);
        assert!((density.bottom_right - 0.04).abs() < 1e-9);
    }

    #[test]
    fn narrow_mask_has_empty_left_quadrants() {
        let mask = GrayImage::from_pixel(1, 4, Luma([255]));
        let density = quadrant_density(&mask);
        assert_eq!(density.top_left, 0.0);
        assert_eq!(density.top_right, 1.0);
    }

    #[test]
    fn even_spacing_has_no_spread() {
        assert_eq!(gap_spread(&[40.0, 10.0, 30.0, 20.0]), 0.0);
        assert_eq!(gap_spread(&[]), 0.0);
        assert_eq!(gap_spread(&[5.0]), 0.0);
        // Gaps 10 and 30: mean 20, std 10.
        assert!((gap_spread(&[0.0, 10.0, 40.0]) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn regularity_multiplies_groups() {
        let uneven: &[f64] = &[0.0, 10.0, 40.0];
        let empty: &[f64] = &[];
        assert_eq!(layout_regularity(&[empty, empty, empty]), 1.0);
        let value = layout_regularity(&[uneven, uneven, empty]);
        assert!((value - (1.0 / 1.1f64).powi(2)).abs() < 1e-9);
    }

    #[test]
    fn saturated_count_contributes_only_its_weight() {
        let contours_only = StructureCounts {
            contours: 2000,
            ..StructureCounts::default()
        };
        assert!((complexity_score(&contours_only, 1.0) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn complexity_is_bounded() {
        assert_eq!(complexity_score(&StructureCounts::default(), 1.0), 0.0);

        let saturated = StructureCounts {
            contours: 10_000,
            hierarchy_depth: 50,
            horizontal_lines: 500,
            vertical_lines: 500,
            diagonal_lines: 300,
            text_regions: 1000,
        };
        assert!((complexity_score(&saturated, 0.0) - 1.0).abs() < 1e-9);

        let modest = StructureCounts {
            contours: 100,
            text_regions: 10,
            ..StructureCounts::default()
        };
        let score = complexity_score(&modest, 1.0);
        assert!((score - (0.1 * 0.15 + 0.1 * 0.20)).abs() < 1e-9);
    }
}
