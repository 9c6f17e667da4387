// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — first-page rasterization through an external collaborator.

pub mod rasterize;

pub use rasterize::{PdfRasterizer, PdftoppmRasterizer, rasterize_first_page};
