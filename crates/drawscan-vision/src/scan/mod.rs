// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan pipeline — A4 size classification, quality scoring, and enhancement.

pub mod enhance;
pub mod filters;
pub(crate) mod integral;
pub mod quality;
pub mod size;

pub use enhance::{EnhanceOutcome, Enhancer, FailSoft, ImageTransform};
pub use filters::LumaFilter;
pub use quality::QualityScorer;
pub use size::SizeClassifier;
