// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A4 conformance — converts pixel dimensions plus DPI into millimetres,
// tests the portrait and landscape hypotheses independently, and derives a
// normalisation scale factor. Non-conformance is a normal outcome, never an
// error.

use drawscan_core::config::SizeConfig;
use drawscan_core::error::{DrawScanError, Result};
use drawscan_core::{A4_HEIGHT_MM, A4_RATIO, A4_WIDTH_MM, DrawingGeometry, MM_PER_INCH, Orientation};
use tracing::{debug, instrument, warn};

/// Classifies a page's physical size against A4.
#[derive(Debug, Clone)]
pub struct SizeClassifier {
    config: SizeConfig,
}

impl SizeClassifier {
    pub fn new(config: SizeConfig) -> Self {
        Self { config }
    }

    /// Validate a declared DPI, substituting the standard DPI when it lies
    /// outside the accepted range.
    pub fn effective_dpi(&self, dpi: u32) -> u32 {
        if (self.config.min_dpi..=self.config.max_dpi).contains(&dpi) {
            dpi
        } else {
            warn!(
                dpi,
                min = self.config.min_dpi,
                max = self.config.max_dpi,
                fallback = self.config.standard_dpi,
                "Declared DPI out of range; using standard DPI"
            );
            self.config.standard_dpi
        }
    }

    /// Classify a `width_px` x `height_px` page declared at `dpi`.
    ///
    /// Only a zero-area page is an error.
    #[instrument(skip(self))]
    pub fn classify(&self, width_px: u32, height_px: u32, dpi: u32) -> Result<DrawingGeometry> {
        if width_px == 0 || height_px == 0 {
            return Err(DrawScanError::Dimension {
                width: width_px,
                height: height_px,
            });
        }

        let dpi = self.effective_dpi(dpi);
        let width_mm = width_px as f64 * MM_PER_INCH / dpi as f64;
        let height_mm = height_px as f64 * MM_PER_INCH / dpi as f64;

        let portrait = self.matches(width_mm, height_mm, A4_WIDTH_MM, A4_HEIGHT_MM);
        let landscape = self.matches(width_mm, height_mm, A4_HEIGHT_MM, A4_WIDTH_MM);

        let scale_factor = if portrait {
            A4_WIDTH_MM / width_mm
        } else if landscape {
            A4_HEIGHT_MM / width_mm
        } else {
            // Pick whichever reading of the aspect is closer to A4.
            let portrait_ratio = width_mm / height_mm;
            let landscape_ratio = height_mm / width_mm;
            if (portrait_ratio - A4_RATIO).abs() < (landscape_ratio - A4_RATIO).abs() {
                A4_WIDTH_MM / width_mm
            } else {
                A4_HEIGHT_MM / width_mm
            }
        };

        debug!(
            width_mm,
            height_mm, portrait, landscape, scale_factor, "Size classified"
        );

        Ok(DrawingGeometry {
            width_px,
            height_px,
            dpi,
            orientation: Orientation::from_pixels(width_px, height_px),
            is_valid_a4: portrait || landscape,
            scale_factor,
        })
    }

    /// Both sides within tolerance of the target and the aspect within the
    /// ratio tolerance of the target aspect.
    fn matches(&self, width_mm: f64, height_mm: f64, target_w: f64, target_h: f64) -> bool {
        let tolerance = self.config.tolerance_mm;
        (width_mm - target_w).abs() <= tolerance
            && (height_mm - target_h).abs() <= tolerance
            && (width_mm / height_mm - target_w / target_h).abs() <= self.config.ratio_tolerance
    }
}

impl Default for SizeClassifier {
    fn default() -> Self {
        Self::new(SizeConfig::default())
    }
}
