// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration. Every tolerance and threshold the engine uses lives
// here and is passed in explicitly; nothing is a hidden constant.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DrawScanError, Result};

/// Complete engine settings, grouped per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub size: SizeConfig,
    pub quality: QualityConfig,
    pub enhance: EnhanceConfig,
    pub layout: LayoutConfig,
}

/// A4 conformance settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    /// DPI assumed when metadata is missing or out of range.
    pub standard_dpi: u32,
    pub min_dpi: u32,
    pub max_dpi: u32,
    /// Allowed deviation from 210x297 mm on each side.
    pub tolerance_mm: f64,
    /// Allowed deviation of width/height from 210/297.
    pub ratio_tolerance: f64,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            standard_dpi: 300,
            min_dpi: 150,
            max_dpi: 600,
            tolerance_mm: 2.0,
            ratio_tolerance: 0.01,
        }
    }
}

/// Quality scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Composite score below which a drawing is sent for enhancement.
    pub min_acceptable_score: f64,
    /// Half-width of the window used for the local noise estimate.
    pub noise_window_radius: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_acceptable_score: 0.5,
            noise_window_radius: 1,
        }
    }
}

/// Enhancement pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Resolution of the canonical A4 grid images are resized onto.
    pub target_dpi: u32,
    pub clahe_clip_limit: f32,
    /// Tiles per axis for adaptive histogram equalization.
    pub clahe_tiles: u32,
    /// Bilateral window diameter in pixels (odd).
    pub bilateral_window: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_spatial: f32,
    /// Sigma of the blurred copy used by the unsharp mask.
    pub unsharp_sigma: f32,
    /// Weight of the original luma; the blurred copy gets `1 - amount`.
    pub unsharp_amount: f32,
    pub gamma: f32,
    /// File name prefix for enhanced artifacts.
    pub output_prefix: String,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            target_dpi: 300,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            bilateral_window: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_spatial: 75.0,
            unsharp_sigma: 10.0,
            unsharp_amount: 1.5,
            gamma: 1.2,
            output_prefix: "optimized_".into(),
        }
    }
}

/// Layout feature extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Neighbourhood radius of the adaptive threshold.
    pub threshold_block_radius: u32,
    /// Pixels must be this much darker than their local mean to count as ink.
    pub threshold_offset: i32,
    /// Radius of the speckle-removing morphological opening (0 disables it).
    pub opening_radius: u8,
    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_vote_threshold: u32,
    pub hough_suppression_radius: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    /// Parallel segments closer than this across the line are one stroke.
    pub line_merge_distance: f32,
    pub border_min_area_ratio: f64,
    pub border_max_area_ratio: f64,
    /// Minimum normalized rectangularity (`16 * area / perimeter^2`).
    pub border_rectangularity: f64,
    /// How many of the largest contours are considered for the border.
    pub border_candidates: usize,
    pub text_min_area: f64,
    pub text_max_area: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            threshold_block_radius: 15,
            threshold_offset: 10,
            opening_radius: 1,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 100,
            hough_suppression_radius: 8,
            min_line_length: 100,
            max_line_gap: 10,
            line_merge_distance: 6.0,
            border_min_area_ratio: 0.70,
            border_max_area_ratio: 0.95,
            border_rectangularity: 0.85,
            border_candidates: 3,
            text_min_area: 100.0,
            text_max_area: 10_000.0,
        }
    }
}

impl EngineConfig {
    /// Load a (possibly partial) JSON config file. Missing fields keep their
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the engine's formulas undefined.
    pub fn validate(&self) -> Result<()> {
        let size = &self.size;
        if size.min_dpi == 0 || size.min_dpi > size.max_dpi {
            return Err(DrawScanError::Config(format!(
                "DPI range [{}, {}] is empty",
                size.min_dpi, size.max_dpi
            )));
        }
        if !(size.min_dpi..=size.max_dpi).contains(&size.standard_dpi) {
            return Err(DrawScanError::Config(format!(
                "standard DPI {} lies outside [{}, {}]",
                size.standard_dpi, size.min_dpi, size.max_dpi
            )));
        }
        if size.tolerance_mm < 0.0 || size.ratio_tolerance < 0.0 {
            return Err(DrawScanError::Config("tolerances must be non-negative".into()));
        }

        let enhance = &self.enhance;
        if enhance.target_dpi == 0 {
            return Err(DrawScanError::Config("target DPI must be positive".into()));
        }
        if enhance.gamma <= 0.0 || !enhance.gamma.is_finite() {
            return Err(DrawScanError::Config(format!(
                "gamma {} must be positive",
                enhance.gamma
            )));
        }
        if enhance.clahe_tiles == 0 || enhance.clahe_clip_limit <= 0.0 {
            return Err(DrawScanError::Config(
                "CLAHE tiles and clip limit must be positive".into(),
            ));
        }
        if enhance.bilateral_window == 0 || enhance.bilateral_window % 2 == 0 {
            return Err(DrawScanError::Config(format!(
                "bilateral window {} must be odd",
                enhance.bilateral_window
            )));
        }
        if enhance.unsharp_sigma <= 0.0 {
            return Err(DrawScanError::Config("unsharp sigma must be positive".into()));
        }

        let layout = &self.layout;
        if layout.threshold_block_radius == 0 {
            return Err(DrawScanError::Config(
                "threshold block radius must be positive".into(),
            ));
        }
        if layout.line_merge_distance.is_nan() || layout.line_merge_distance < 0.0 {
            return Err(DrawScanError::Config(format!(
                "line merge distance {} must be non-negative",
                layout.line_merge_distance
            )));
        }
        if layout.canny_low > layout.canny_high {
            return Err(DrawScanError::Config(format!(
                "Canny thresholds inverted ({} > {})",
                layout.canny_low, layout.canny_high
            )));
        }
        if !(0.0..=1.0).contains(&layout.border_min_area_ratio)
            || !(0.0..=1.0).contains(&layout.border_max_area_ratio)
            || layout.border_min_area_ratio > layout.border_max_area_ratio
        {
            return Err(DrawScanError::Config(format!(
                "border area ratio range [{}, {}] is invalid",
                layout.border_min_area_ratio, layout.border_max_area_ratio
            )));
        }
        if layout.text_min_area > layout.text_max_area {
            return Err(DrawScanError::Config(format!(
                "text area range [{}, {}] is inverted",
                layout.text_min_area, layout.text_max_area
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().expect("defaults must validate");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "size": {{ "tolerance_mm": 5.0 }} }}"#).unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.size.tolerance_mm, 5.0);
        assert_eq!(config.size.standard_dpi, 300);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn inverted_dpi_range_is_rejected() {
        let mut config = EngineConfig::default();
        config.size.min_dpi = 700;
        assert!(matches!(config.validate(), Err(DrawScanError::Config(_))));
    }

    #[test]
    fn even_bilateral_window_is_rejected() {
        let mut config = EngineConfig::default();
        config.enhance.bilateral_window = 8;
        assert!(matches!(config.validate(), Err(DrawScanError::Config(_))));
    }

    #[test]
    fn negative_line_merge_distance_is_rejected() {
        let mut config = EngineConfig::default();
        config.layout.line_merge_distance = -1.0;
        assert!(matches!(config.validate(), Err(DrawScanError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(file.path()),
            Err(DrawScanError::Serialization(_))
        ));
    }
}
