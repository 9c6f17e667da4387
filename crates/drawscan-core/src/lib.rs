// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawscan — Core report types, error definitions, and engine configuration
// shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::DrawScanError;
pub use types::*;
