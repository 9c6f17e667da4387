// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout feature extraction — binarise, trace contours, detect and classify
// line segments, then condense everything into `LayoutFeatures`.

use drawscan_core::config::LayoutConfig;
use drawscan_core::error::{DrawScanError, Result};
use drawscan_core::LayoutFeatures;
use image::GrayImage;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::binarize::clean_ink_mask;
use super::contours::{ContourShape, find_border, hierarchy_depth, text_regions, trace_contours};
use super::lines::{ClassifiedLines, detect_segments};
use super::metrics::{
    StructureCounts, complexity_score, layout_regularity, quadrant_density, symmetry_score,
};

/// Features plus the intermediate structures they were derived from.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutAnalysis {
    pub features: LayoutFeatures,
    pub lines: ClassifiedLines,
    /// Outline of the detected drawing border.
    pub border: Option<ContourShape>,
    /// Bounding boxes of the text-sized top-level contours.
    pub text_blocks: Vec<(u32, u32, u32, u32)>,
}

/// Derives structural descriptors from a grayscale drawing.
#[derive(Debug, Clone, Default)]
pub struct LayoutFeatureExtractor {
    config: LayoutConfig,
}

impl LayoutFeatureExtractor {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Compute the layout features of `gray`.
    pub fn extract(&self, gray: &GrayImage) -> Result<LayoutFeatures> {
        Ok(self.analyze(gray)?.features)
    }

    /// Compute the layout features together with the classified segments,
    /// the border outline, and the text block boxes.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn analyze(&self, gray: &GrayImage) -> Result<LayoutAnalysis> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(DrawScanError::Dimension { width, height });
        }
        let config = &self.config;

        let mask = clean_ink_mask(
            gray,
            config.threshold_block_radius,
            config.threshold_offset,
            config.opening_radius,
        );

        // -- Contours ---------------------------------------------------------

        let shapes = trace_contours(&mask);
        let depth = hierarchy_depth(&shapes);
        let image_area = f64::from(width) * f64::from(height);
        let border = find_border(&shapes, image_area, config).map(|index| shapes[index].clone());
        let text: Vec<&ContourShape> = text_regions(&shapes, config).collect();

        // -- Lines ------------------------------------------------------------

        let lines = ClassifiedLines::from_segments(detect_segments(gray, config));

        // -- Whole-sheet metrics ----------------------------------------------

        let horizontal_ys: Vec<f64> = lines
            .horizontal
            .iter()
            .map(|s| f64::from(s.midpoint().1))
            .collect();
        let vertical_xs: Vec<f64> = lines
            .vertical
            .iter()
            .map(|s| f64::from(s.midpoint().0))
            .collect();
        let text_ys: Vec<f64> = text.iter().map(|shape| f64::from(shape.top())).collect();

        let regularity = layout_regularity(&[&horizontal_ys[..], &vertical_xs[..], &text_ys[..]]);
        let counts = StructureCounts {
            contours: shapes.len(),
            hierarchy_depth: depth,
            horizontal_lines: lines.horizontal.len(),
            vertical_lines: lines.vertical.len(),
            diagonal_lines: lines.diagonal.len(),
            text_regions: text.len(),
        };
        let complexity = complexity_score(&counts, regularity);
        let symmetry = symmetry_score(&mask);
        let density = quadrant_density(&mask);

        debug!(symmetry, regularity, complexity, "Sheet metrics computed");

        let features = LayoutFeatures {
            contour_count: counts.contours,
            hierarchy_depth: counts.hierarchy_depth,
            horizontal_lines: counts.horizontal_lines,
            vertical_lines: counts.vertical_lines,
            diagonal_lines: counts.diagonal_lines,
            text_regions: counts.text_regions,
            has_border: border.is_some(),
            symmetry_score: symmetry,
            density_distribution: density,
            layout_regularity: regularity,
            complexity_score: complexity,
        };

        info!(
            contours = features.contour_count,
            lines = lines.total(),
            text_regions = features.text_regions,
            has_border = features.has_border,
            "Layout features extracted"
        );

        Ok(LayoutAnalysis {
            features,
            lines,
            border,
            text_blocks: text.iter().map(|shape| shape.bounds).collect(),
        })
    }
}

// -- Tests --------------------------------------------------------------------
