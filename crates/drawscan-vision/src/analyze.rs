// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Drawing analyzer — loads a raster or the first page of a PDF, classifies
// its size, scores its quality, and on request enhances it or extracts its
// layout.

use std::path::{Path, PathBuf};

use drawscan_core::error::{DrawScanError, Result};
use drawscan_core::{DrawingReport, EngineConfig, LayoutFeatures, SourceFormat};
use tracing::{info, instrument, warn};

use crate::image::RasterImage;
use crate::layout::{LayoutAnalysis, LayoutFeatureExtractor};
use crate::pdf::{PdfRasterizer, rasterize_first_page};
use crate::scan::{Enhancer, QualityScorer, SizeClassifier};

/// Entry point tying the classifier, scorer, enhancer, and layout extractor
/// together.
pub struct DrawingAnalyzer {
    config: EngineConfig,
    size: SizeClassifier,
    quality: QualityScorer,
    enhancer: Enhancer,
    layout: LayoutFeatureExtractor,
    rasterizer: Option<Box<dyn PdfRasterizer>>,
}

impl DrawingAnalyzer {
    // -- Construction ---------------------------------------------------------

    /// Analyzer for raster sources only; PDF input is rejected.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            size: SizeClassifier::new(config.size.clone()),
            quality: QualityScorer::new(config.quality.clone()),
            enhancer: Enhancer::new(config.enhance.clone()),
            layout: LayoutFeatureExtractor::new(config.layout.clone()),
            rasterizer: None,
            config,
        })
    }

    /// Enable PDF input through `rasterizer`.
    pub fn with_rasterizer(mut self, rasterizer: impl PdfRasterizer + 'static) -> Self {
        self.rasterizer = Some(Box::new(rasterizer));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- Loading --------------------------------------------------------------

    /// Decode `path` into a raster, rasterizing the first page of a PDF.
    pub fn load(&self, path: &Path) -> Result<RasterImage> {
        let fallback_dpi = self.config.size.standard_dpi;
        match SourceFormat::from_path(path) {
            Some(SourceFormat::Pdf) => {
                let rasterizer = self.rasterizer.as_deref().ok_or_else(|| {
                    DrawScanError::UnsupportedFormat(format!(
                        "{} is a PDF and no rasterizer is configured",
                        path.display()
                    ))
                })?;
                rasterize_first_page(path, rasterizer, fallback_dpi)
            }
            _ => RasterImage::open(path, fallback_dpi),
        }
    }

    // -- Analysis -------------------------------------------------------------

    /// Size classification and quality score for the drawing at `path`.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn analyze(&self, path: &Path) -> Result<DrawingReport> {
        let raster = self.load(path)?;
        let mut report = self.analyze_image(&raster)?;
        report.source = path.to_path_buf();
        Ok(report)
    }

    /// Size classification and quality score for an already-decoded raster.
    ///
    /// The report's `source` is left empty.
    pub fn analyze_image(&self, raster: &RasterImage) -> Result<DrawingReport> {
        let geometry = self
            .size
            .classify(raster.width(), raster.height(), raster.dpi())?;
        let quality = self.quality.score(&raster.to_gray());

        info!(
            valid_a4 = geometry.is_valid_a4,
            orientation = %geometry.orientation,
            composite = quality.composite,
            "Drawing analyzed"
        );

        Ok(DrawingReport {
            source: PathBuf::new(),
            format: raster.format(),
            geometry,
            quality,
        })
    }

    /// Whether a drawing should be enhanced before further processing.
    pub fn needs_enhancement(&self, report: &DrawingReport) -> bool {
        !report.geometry.is_valid_a4 || !self.quality.is_acceptable(&report.quality)
    }

    /// Layout features of the drawing at `path`.
    pub fn extract_layout(&self, path: &Path) -> Result<LayoutFeatures> {
        Ok(self.analyze_layout(path)?.features)
    }

    /// Layout features of the drawing at `path` with the segments, border,
    /// and text blocks behind them.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn analyze_layout(&self, path: &Path) -> Result<LayoutAnalysis> {
        let raster = self.load(path)?;
        self.layout.analyze(&raster.to_gray())
    }

    // -- Optimization ---------------------------------------------------------

    /// Enhance the drawing if it needs it and return the path to use from now
    /// on.
    ///
    /// A drawing that is already valid A4 with acceptable quality is returned
    /// as-is. Otherwise the enhanced image is written to `output`, or next to
    /// the source as `<prefix><name>`; the source file is never modified. A
    /// failing enhancement step is logged and the unmodified pixels are
    /// written instead.
    #[instrument(skip(self, output), fields(path = %path.display()))]
    pub fn optimize(&self, path: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let raster = self.load(path)?;
        let report = self.analyze_image(&raster)?;
        if !self.needs_enhancement(&report) {
            info!("Drawing already conforms; no enhancement needed");
            return Ok(path.to_path_buf());
        }

        let target = match output {
            Some(explicit) => explicit.to_path_buf(),
            None => self.default_output_path(path, raster.format()),
        };

        let outcome = self.enhancer.enhance(raster.into_dynamic());
        if !outcome.is_enhanced() {
            warn!("Enhancement failed; writing the unmodified image");
        }

        outcome.image().save(&target).map_err(|err| {
            DrawScanError::ImageEncode(format!("failed to write {}: {}", target.display(), err))
        })?;

        info!(output = %target.display(), "Optimized drawing written");
        Ok(target)
    }

    /// `<prefix><file name>` beside the source. Rasterized PDF pages are
    /// written as PNG.
    fn default_output_path(&self, path: &Path, format: SourceFormat) -> PathBuf {
        let file_name = match format {
            SourceFormat::Pdf => path
                .file_stem()
                .map(|stem| format!("{}.png", stem.to_string_lossy())),
            _ => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        }
        .unwrap_or_else(|| "drawing.png".to_string());

        path.with_file_name(format!("{}{}", self.config.enhance.output_prefix, file_name))
    }
}

// -- Tests --------------------------------------------------------------------
