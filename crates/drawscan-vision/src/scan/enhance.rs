// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawing enhancement pipeline — resize onto the canonical A4 grid, then
// CLAHE, bilateral denoise, unsharp mask, and gamma on the luma channel only.
// `FailSoft` wraps any transform so that a failing step hands back the
// untouched input instead of an error.

use std::panic::{self, AssertUnwindSafe};

use drawscan_core::a4_pixels;
use drawscan_core::config::EnhanceConfig;
use drawscan_core::error::{DrawScanError, Result};
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, error, info, instrument};

use super::filters::{LumaChroma, LumaFilter, standard_filters};

/// A whole-image transformation that may fail.
pub trait ImageTransform {
    fn transform(&self, image: &DynamicImage) -> Result<DynamicImage>;
}

impl<T: ImageTransform + ?Sized> ImageTransform for &T {
    fn transform(&self, image: &DynamicImage) -> Result<DynamicImage> {
        (**self).transform(image)
    }
}

/// Result of a fail-soft transformation.
#[derive(Debug, Clone)]
pub enum EnhanceOutcome {
    /// Every step succeeded.
    Enhanced(DynamicImage),
    /// A step failed; `image` is the input, unmodified.
    Unchanged { image: DynamicImage, reason: String },
}

impl EnhanceOutcome {
    pub fn is_enhanced(&self) -> bool {
        matches!(self, Self::Enhanced(_))
    }

    pub fn image(&self) -> &DynamicImage {
        match self {
            Self::Enhanced(image) | Self::Unchanged { image, .. } => image,
        }
    }

    pub fn into_image(self) -> DynamicImage {
        match self {
            Self::Enhanced(image) | Self::Unchanged { image, .. } => image,
        }
    }
}

/// Attempt-then-fallback wrapper: never fails, never panics outward.
#[derive(Debug, Clone)]
pub struct FailSoft<T> {
    inner: T,
}

impl<T: ImageTransform> FailSoft<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Run the wrapped transform, returning `image` itself if it errors or
    /// panics.
    pub fn apply(&self, image: DynamicImage) -> EnhanceOutcome {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.inner.transform(&image)));
        match attempt {
            Ok(Ok(enhanced)) => EnhanceOutcome::Enhanced(enhanced),
            Ok(Err(err)) => {
                error!(error = %err, "Enhancement failed; returning original image");
                EnhanceOutcome::Unchanged {
                    image,
                    reason: err.to_string(),
                }
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "enhancement step panicked".to_string());
                error!(reason = %reason, "Enhancement panicked; returning original image");
                EnhanceOutcome::Unchanged { image, reason }
            }
        }
    }
}

/// Resizes drawings onto the A4 pixel grid and improves their legibility.
pub struct Enhancer {
    config: EnhanceConfig,
    filters: Vec<Box<dyn LumaFilter>>,
}

impl Enhancer {
    // -- Construction ---------------------------------------------------------

    /// Enhancer running the standard luma filter chain.
    pub fn new(config: EnhanceConfig) -> Self {
        let filters = standard_filters(&config);
        Self { config, filters }
    }

    /// Enhancer running a caller-supplied luma filter chain.
    pub fn with_filters(config: EnhanceConfig, filters: Vec<Box<dyn LumaFilter>>) -> Self {
        Self { config, filters }
    }

    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    // -- Geometry -------------------------------------------------------------

    /// Output size for a `width` x `height` source: the source aspect fitted
    /// inside the A4 grid at the target DPI, in the source's orientation.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (a4_w, a4_h) = a4_pixels(self.config.target_dpi);
        // Portrait sources fit a portrait sheet; everything else a landscape one.
        let (sheet_w, sheet_h) = if height > width {
            (a4_w, a4_h)
        } else {
            (a4_h, a4_w)
        };

        let source_ratio = width as f64 / height.max(1) as f64;
        let sheet_ratio = sheet_w as f64 / sheet_h as f64;
        let (w, h) = if source_ratio > sheet_ratio {
            (sheet_w, (sheet_w as f64 / source_ratio).round() as u32)
        } else {
            ((sheet_h as f64 * source_ratio).round() as u32, sheet_h)
        };
        (w.max(1), h.max(1))
    }

    fn resize_to_a4(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(DrawScanError::Dimension { width, height });
        }
        let (target_w, target_h) = self.target_size(width, height);
        info!(
            from_w = width,
            from_h = height,
            target_w,
            target_h,
            "Resizing onto A4 grid"
        );
        // Triangle support widens with the downscale factor, averaging the
        // covered source area.
        Ok(image.resize_exact(target_w, target_h, FilterType::Triangle))
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run the full pipeline, falling back to the untouched input if any step
    /// fails.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn enhance(&self, image: DynamicImage) -> EnhanceOutcome {
        FailSoft::new(self).apply(image)
    }
}

impl ImageTransform for Enhancer {
    /// Strict pipeline: the first failing step aborts with its error.
    fn transform(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let resized = self.resize_to_a4(image)?;

        let mut planes = LumaChroma::split(&resized);
        for filter in &self.filters {
            planes.luma = filter.apply(&planes.luma)?;
            debug!(step = filter.name(), "Luma filter applied");
        }

        let merged = planes.merge()?;
        info!(
            width = merged.width(),
            height = merged.height(),
            steps = self.filters.len(),
            "Enhancement complete"
        );
        Ok(merged)
    }
}
