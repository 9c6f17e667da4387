// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Drawscan.

use thiserror::Error;

/// Top-level error type for all Drawscan operations.
#[derive(Debug, Error)]
pub enum DrawScanError {
    // -- Source errors --
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("degenerate image dimensions {width}x{height}")]
    Dimension { width: u32, height: u32 },

    #[error("PDF rasterization failed: {0}")]
    Rasterize(String),

    // -- Processing errors --
    #[error("enhancement step `{step}` failed: {reason}")]
    Enhancement { step: &'static str, reason: String },

    #[error("image encoding failed: {0}")]
    ImageEncode(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DrawScanError {
    /// Shorthand for a failed enhancement step.
    pub fn enhancement(step: &'static str, reason: impl Into<String>) -> Self {
        Self::Enhancement {
            step,
            reason: reason.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DrawScanError>;
