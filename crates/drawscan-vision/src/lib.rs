// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// drawscan-vision — Geometric and layout analysis of scanned engineering
// drawings.
//
// Provides raster and PDF loading with DPI metadata, A4 size classification,
// scan quality scoring, fail-soft enhancement, and layout feature extraction
// (contours, rule lines, borders, text blocks, symmetry, density).

pub mod analyze;
pub mod image;
pub mod layout;
pub mod pdf;
pub mod scan;

// Re-export the primary structs so callers can use `drawscan_vision::DrawingAnalyzer` etc.
pub use analyze::DrawingAnalyzer;
pub use image::raster::RasterImage;
pub use layout::extract::{LayoutAnalysis, LayoutFeatureExtractor};
pub use pdf::rasterize::{PdfRasterizer, PdftoppmRasterizer};
pub use scan::enhance::{EnhanceOutcome, Enhancer};
pub use scan::quality::QualityScorer;
pub use scan::size::SizeClassifier;
