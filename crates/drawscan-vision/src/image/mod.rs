// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding raster sources into 8-bit buffers and reading the
// declared resolution from container metadata.

pub mod dpi;
pub mod raster;

pub use raster::{ChannelLayout, RasterImage};
