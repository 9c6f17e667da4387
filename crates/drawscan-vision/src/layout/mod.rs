// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout module — structural descriptors of a drawing sheet.

pub mod binarize;
pub mod contours;
pub mod extract;
pub mod lines;
pub mod metrics;

pub use extract::{LayoutAnalysis, LayoutFeatureExtractor};
pub use lines::{ClassifiedLines, LineClass, LineSegment};
