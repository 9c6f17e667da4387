// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour hierarchy analysis — nesting depth, drawing-border detection, and
// the coarse text-block count derived from small top-level contours.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::geometry::arc_length;
use serde::Serialize;
use tracing::debug;

use drawscan_core::config::LayoutConfig;

/// Geometry of one traced contour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourShape {
    pub area: f64,
    pub perimeter: f64,
    /// Bounding box as (left, top, right, bottom), inclusive.
    pub bounds: (u32, u32, u32, u32),
    pub parent: Option<usize>,
    pub is_hole: bool,
}

impl ContourShape {
    fn from_contour(contour: &Contour<u32>) -> Self {
        let xs = contour.points.iter().map(|p| p.x);
        let ys = contour.points.iter().map(|p| p.y);
        let bounds = (
            xs.clone().min().unwrap_or(0),
            ys.clone().min().unwrap_or(0),
            xs.max().unwrap_or(0),
            ys.max().unwrap_or(0),
        );

        Self {
            area: polygon_area(&contour.points),
            perimeter: arc_length(&contour.points, true),
            bounds,
            parent: contour.parent,
            is_hole: contour.border_type == BorderType::Hole,
        }
    }

    /// Isoperimetric rectangularity, `16·area / perimeter²`.
    ///
    /// A square scores 1.0 and an A4-proportioned rectangle about 0.97;
    /// irregular or elongated outlines fall well below.
    pub fn rectangularity(&self) -> f64 {
        if self.perimeter <= f64::EPSILON {
            return 0.0;
        }
        16.0 * self.area / (self.perimeter * self.perimeter)
    }

    pub fn top(&self) -> u32 {
        self.bounds.1
    }
}

/// Trace every contour of a binary mask, outer and hole borders alike.
pub fn trace_contours(mask: &GrayImage) -> Vec<ContourShape> {
    let contours: Vec<Contour<u32>> = find_contours(mask);
    let shapes: Vec<ContourShape> = contours.iter().map(ContourShape::from_contour).collect();
    debug!(contours = shapes.len(), "Contours traced");
    shapes
}

/// Length of the longest parent chain, counting the contour itself.
pub fn hierarchy_depth(shapes: &[ContourShape]) -> usize {
    (0..shapes.len())
        .map(|start| {
            let mut depth = 1;
            let mut current = shapes[start].parent;
            while let Some(parent) = current {
                // A malformed hierarchy must not loop forever.
                if depth > shapes.len() {
                    break;
                }
                depth += 1;
                current = shapes.get(parent).and_then(|shape| shape.parent);
            }
            depth
        })
        .max()
        .unwrap_or(0)
}

/// Index of the drawing border, if any.
///
/// Only the `border_candidates` largest contours are considered, in
/// descending area order; the first covering the configured share of the
/// image with sufficient rectangularity wins.
pub fn find_border(shapes: &[ContourShape], image_area: f64, config: &LayoutConfig) -> Option<usize> {
    if image_area <= 0.0 {
        return None;
    }

    let mut by_area: Vec<usize> = (0..shapes.len()).collect();
    by_area.sort_by(|&a, &b| shapes[b].area.total_cmp(&shapes[a].area));

    by_area
        .into_iter()
        .take(config.border_candidates)
        .find(|&index| {
            let shape = &shapes[index];
            let coverage = shape.area / image_area;
            (config.border_min_area_ratio..=config.border_max_area_ratio).contains(&coverage)
                && shape.rectangularity() > config.border_rectangularity
        })
}

/// Top-level contours sized like text blocks.
pub fn text_regions<'a>(
    shapes: &'a [ContourShape],
    config: &LayoutConfig,
) -> impl Iterator<Item = &'a ContourShape> {
    let (min, max) = (config.text_min_area, config.text_max_area);
    shapes
        .iter()
        .filter(move |shape| shape.parent.is_none() && (min..=max).contains(&shape.area))
}

/// Polygon area by the shoelace formula; vertex order may be either way.
fn polygon_area(points: &[imageproc::point::Point<u32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as f64 * points[j].y as f64;
        twice_area -= points[j].x as f64 * points[i].y as f64;
    }
    twice_area.abs() / 2.0
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::point::Point;

    fn fill(mask: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                mask.put_pixel(x, y, Luma([value]));
            }
        }
    }

    fn shape(area: f64, perimeter: f64, parent: Option<usize>) -> ContourShape {
        ContourShape {
            area,
            perimeter,
            bounds: (0, 0, 0, 0),
            parent,
            is_hole: false,
        }
    }

    #[test]
    fn shoelace_area_of_rectangle() {
        let points = [
            Point::new(0u32, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(0, 5),
        ];
        assert!((polygon_area(&points) - 50.0).abs() < 1e-9);
        assert_eq!(polygon_area(&points[..2]), 0.0);
    }

    #[test]
    fn rectangularity_of_ideal_shapes() {
        let square = shape(100.0, 40.0, None);
        assert!((square.rectangularity() - 1.0).abs() < 1e-9);

        // 210 x 297 sheet outline.
        let sheet = shape(210.0 * 297.0, 2.0 * (210.0 + 297.0), None);
        assert!(sheet.rectangularity() > 0.95);

        let sliver = shape(100.0, 202.0, None);
        assert!(sliver.rectangularity() < 0.1);
        assert_eq!(shape(0.0, 0.0, None).rectangularity(), 0.0);
    }

    #[test]
    fn depth_follows_parent_chain() {
        let shapes = vec![
            shape(1.0, 1.0, None),
            shape(1.0, 1.0, Some(0)),
            shape(1.0, 1.0, Some(1)),
            shape(1.0, 1.0, None),
        ];
        assert_eq!(hierarchy_depth(&shapes), 3);
        assert_eq!(hierarchy_depth(&shapes[..1]), 1);
        assert_eq!(hierarchy_depth(&[]), 0);
    }

    #[test]
    fn depth_survives_cyclic_parents() {
        let shapes = vec![shape(1.0, 1.0, Some(1)), shape(1.0, 1.0, Some(0))];
        assert!(hierarchy_depth(&shapes) <= 3);
    }

    #[test]
    fn traced_frame_nests_inner_blob() {
        let mut mask = GrayImage::new(100, 100);
        fill(&mut mask, 10, 10, 89, 89, 255);
        fill(&mut mask, 15, 15, 84, 84, 0);
        fill(&mut mask, 40, 40, 59, 59, 255);

        let shapes = trace_contours(&mask);
        // Frame outer border, frame hole, inner blob.
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes.iter().filter(|s| s.is_hole).count(), 1);
        assert_eq!(hierarchy_depth(&shapes), 3);
    }

    #[test]
    fn border_requires_coverage_and_rectangularity() {
        let config = LayoutConfig::default();
        let image_area = 1000.0 * 1000.0;

        let framed = vec![shape(800_000.0, 3600.0, None)];
        assert_eq!(find_border(&framed, image_area, &config), Some(0));

        let small = vec![shape(500_000.0, 2900.0, None)];
        assert_eq!(find_border(&small, image_area, &config), None);

        let ragged = vec![shape(800_000.0, 8000.0, None)];
        assert_eq!(find_border(&ragged, image_area, &config), None);

        let full_bleed = vec![shape(990_000.0, 3990.0, None)];
        assert_eq!(find_border(&full_bleed, image_area, &config), None);
    }

    #[test]
    fn border_ignores_contours_past_the_candidate_limit() {
        let config = LayoutConfig {
            border_candidates: 1,
            ..LayoutConfig::default()
        };
        let shapes = vec![
            shape(800_000.0, 3600.0, None),
            shape(990_000.0, 3990.0, None),
        ];
        assert_eq!(find_border(&shapes, 1_000_000.0, &config), None);
    }

    #[test]
    fn text_regions_are_top_level_and_sized() {
        let config = LayoutConfig::default();
        let shapes = vec![
            shape(500.0, 90.0, None),
            shape(500.0, 90.0, Some(0)),
            shape(50.0, 30.0, None),
            shape(50_000.0, 900.0, None),
            shape(100.0, 40.0, None),
        ];
        assert_eq!(text_regions(&shapes, &config).count(), 2);
    }
}
