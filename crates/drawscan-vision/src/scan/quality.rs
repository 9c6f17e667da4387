// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan quality scoring — contrast, sharpness, and noise estimates on the luma
// channel, averaged into a composite score in [0, 1].

use drawscan_core::QualityMetrics;
use drawscan_core::config::QualityConfig;
use image::GrayImage;
use imageproc::filter::laplacian_filter;
use tracing::{debug, instrument};

use super::integral::IntegralImage;

/// Standard deviation that maps a metric to 1.0.
const HALF_RANGE: f64 = 128.0;

/// Below this global standard deviation an image carries no measurable signal.
const FLAT_STDDEV: f64 = 1e-6;

/// Computes [`QualityMetrics`] for a grayscale page.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    config: QualityConfig,
}

impl QualityScorer {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn score(&self, gray: &GrayImage) -> QualityMetrics {
        let global_std = stddev(gray.pixels().map(|p| p.0[0] as f64));

        // A flat page has nothing to measure noise against, so it scores zero
        // across the board instead of a spurious "perfectly clean".
        if global_std < FLAT_STDDEV {
            debug!("Flat image; all quality metrics are zero");
            return QualityMetrics {
                contrast: 0.0,
                sharpness: 0.0,
                noise: 0.0,
                composite: 0.0,
            };
        }

        let contrast = global_std / HALF_RANGE;

        let laplacian = laplacian_filter(gray);
        let sharpness = stddev(laplacian.pixels().map(|p| p.0[0] as f64)) / HALF_RANGE;

        let noise = (1.0 - self.local_stddev(gray) / HALF_RANGE).clamp(0.0, 1.0);

        let composite = ((contrast + sharpness + noise) / 3.0).clamp(0.0, 1.0);
        debug!(contrast, sharpness, noise, composite, "Quality scored");

        QualityMetrics {
            contrast,
            sharpness,
            noise,
            composite,
        }
    }

    /// Whether a composite score meets the configured acceptance level.
    pub fn is_acceptable(&self, metrics: &QualityMetrics) -> bool {
        metrics.composite >= self.config.min_acceptable_score
    }

    /// Mean of the per-pixel standard deviation over small neighbourhoods.
    fn local_stddev(&self, gray: &GrayImage) -> f64 {
        let radius = self.config.noise_window_radius.max(1);
        let integral = IntegralImage::new(gray);
        let (w, h) = gray.dimensions();

        let mut total = 0.0;
        for y in 0..h {
            for x in 0..w {
                total += integral.region_variance(x, y, radius).sqrt();
            }
        }
        total / (w as f64 * h as f64)
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

/// Population standard deviation; zero for an empty sequence.
fn stddev(values: impl Iterator<Item = f64>) -> f64 {
    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0, 0.0);
    for v in values {
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return 0.0;
    }
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0).sqrt()
}
