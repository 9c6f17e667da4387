// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report value types produced by the Drawscan engine. Every struct here is a
// plain value computed fresh per analysis call and owned by the caller.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// ISO 216 A4 width in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;
/// ISO 216 A4 height in millimetres.
pub const A4_HEIGHT_MM: f64 = 297.0;
/// Portrait aspect ratio (width / height) of an A4 sheet.
pub const A4_RATIO: f64 = A4_WIDTH_MM / A4_HEIGHT_MM;
/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Pixel size of an A4 sheet at `dpi`, as `(width, height)` in portrait.
pub fn a4_pixels(dpi: u32) -> (u32, u32) {
    let to_px = |mm: f64| (mm * dpi as f64 / MM_PER_INCH).round() as u32;
    (to_px(A4_WIDTH_MM), to_px(A4_HEIGHT_MM))
}

/// Sheet orientation, derived purely from the pixel aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// `height > width` is portrait; everything else (including square) is
    /// landscape.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        if height > width {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container format of an analysis source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    /// First page rasterized by an external collaborator.
    Pdf,
}

impl SourceFormat {
    /// Infer the source format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Infer the source format from a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// Physical size classification of a drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingGeometry {
    pub width_px: u32,
    pub height_px: u32,
    /// Effective DPI after range validation.
    pub dpi: u32,
    pub orientation: Orientation,
    pub is_valid_a4: bool,
    /// Factor that maps the measured size onto A4. Always positive and finite.
    pub scale_factor: f64,
}

impl DrawingGeometry {
    pub fn width_mm(&self) -> f64 {
        self.width_px as f64 * MM_PER_INCH / self.dpi as f64
    }

    pub fn height_mm(&self) -> f64 {
        self.height_px as f64 * MM_PER_INCH / self.dpi as f64
    }
}

/// Scan quality estimates.
///
/// `contrast` and `sharpness` are raw ratios and may exceed 1. `noise` and
/// `composite` are always within `[0, 1]`; a higher `noise` means a cleaner
/// scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub contrast: f64,
    pub sharpness: f64,
    pub noise: f64,
    pub composite: f64,
}

/// Ink fraction of each quadrant of the binary layout mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadrantDensity {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_left: f64,
    pub bottom_right: f64,
}

/// Structural descriptors of a drawing's layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutFeatures {
    pub contour_count: usize,
    /// Longest parent chain among all contours (a lone contour has depth 1).
    pub hierarchy_depth: usize,
    pub horizontal_lines: usize,
    pub vertical_lines: usize,
    pub diagonal_lines: usize,
    pub text_regions: usize,
    pub has_border: bool,
    pub symmetry_score: f64,
    pub density_distribution: QuadrantDensity,
    pub layout_regularity: f64,
    pub complexity_score: f64,
}

impl LayoutFeatures {
    /// Similarity in `[0, 1]` between two layouts, used for template
    /// matching. Identical features score 1.0.
    pub fn similarity(&self, other: &LayoutFeatures) -> f64 {
        fn count_similarity(a: usize, b: usize) -> f64 {
            let max = a.max(b).max(1) as f64;
            1.0 - a.abs_diff(b) as f64 / max
        }

        let weighted = [
            (count_similarity(self.contour_count, other.contour_count), 0.3),
            (
                count_similarity(self.horizontal_lines, other.horizontal_lines),
                0.2,
            ),
            (
                count_similarity(self.vertical_lines, other.vertical_lines),
                0.2,
            ),
            (
                1.0 - (self.complexity_score - other.complexity_score).abs(),
                0.3,
            ),
        ];

        let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
        let score: f64 = weighted.iter().map(|(s, w)| s * w).sum();
        (score / total_weight).clamp(0.0, 1.0)
    }
}

/// Unified result of analysing one drawing source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingReport {
    pub source: PathBuf,
    pub format: SourceFormat,
    pub geometry: DrawingGeometry,
    pub quality: QualityMetrics,
}
