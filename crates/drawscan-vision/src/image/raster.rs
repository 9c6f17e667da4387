// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Owned raster buffer with its declared DPI. Decoding normalises every input
// to 8 bits per channel so downstream code only ever sees u8 samples.

use std::path::Path;

use drawscan_core::SourceFormat;
use drawscan_core::error::{DrawScanError, Result};
use image::{DynamicImage, GrayImage};
use tracing::{debug, info, instrument};

use super::dpi;

/// Channel layout of an 8-bit raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn channels(&self) -> u8 {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// A decoded page: pixels plus the DPI it declares.
///
/// Invariants: both dimensions are non-zero and every channel is 8-bit.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: DynamicImage,
    /// Declared DPI, or the caller's fallback when metadata carried none.
    dpi: u32,
    format: SourceFormat,
}

impl RasterImage {
    // -- Construction ---------------------------------------------------------

    /// Decode a raster file, reading its DPI from container metadata and
    /// falling back to `fallback_dpi` when none is declared.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, fallback_dpi: u32) -> Result<Self> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)
            .filter(SourceFormat::is_raster)
            .ok_or_else(|| {
                DrawScanError::UnsupportedFormat(format!(
                    "{} is not a PNG, JPEG, TIFF, or BMP raster",
                    path.display()
                ))
            })?;

        let decoded = image::open(path).map_err(|err| {
            DrawScanError::ImageDecode(format!("failed to open {}: {}", path.display(), err))
        })?;

        let dpi = match dpi::read_dpi(path, format) {
            Some(declared) => declared,
            None => {
                debug!(fallback_dpi, "No DPI metadata; using fallback");
                fallback_dpi
            }
        };

        let raster = Self::from_dynamic(decoded, dpi, format)?;
        info!(
            width = raster.width(),
            height = raster.height(),
            dpi,
            channels = raster.layout().channels(),
            "Raster loaded"
        );
        Ok(raster)
    }

    /// Wrap an already-decoded image. Fails on zero-area input.
    pub fn from_dynamic(image: DynamicImage, dpi: u32, format: SourceFormat) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DrawScanError::Dimension {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(Self {
            pixels: narrow_to_8bit(image),
            dpi,
            format,
        })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn layout(&self) -> ChannelLayout {
        match &self.pixels {
            DynamicImage::ImageLuma8(_) => ChannelLayout::Gray,
            DynamicImage::ImageLumaA8(_) => ChannelLayout::GrayAlpha,
            DynamicImage::ImageRgba8(_) => ChannelLayout::Rgba,
            _ => ChannelLayout::Rgb,
        }
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Consume the raster and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.pixels
    }

    /// Luma conversion used by every analysis stage.
    pub fn to_gray(&self) -> GrayImage {
        self.pixels.to_luma8()
    }
}

/// Convert 16-bit and float buffers to their 8-bit counterparts.
fn narrow_to_8bit(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => image,
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};

    #[test]
    fn zero_area_image_is_a_dimension_error() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 10));
        let err = RasterImage::from_dynamic(empty, 300, SourceFormat::Png).unwrap_err();
        assert!(matches!(err, DrawScanError::Dimension { width: 0, height: 10 }));
    }

    #[test]
    fn sixteen_bit_input_is_narrowed() {
        let wide: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(4, 4, Luma([65535]));
        let raster =
            RasterImage::from_dynamic(DynamicImage::ImageLuma16(wide), 300, SourceFormat::Tiff)
                .unwrap();
        assert_eq!(raster.layout(), ChannelLayout::Gray);
        assert_eq!(raster.to_gray().get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn open_decodes_png_without_metadata_using_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.png");
        RgbImage::from_pixel(30, 40, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let raster = RasterImage::open(&path, 300).unwrap();
        assert_eq!((raster.width(), raster.height()), (30, 40));
        assert_eq!(raster.dpi(), 300);
        assert_eq!(raster.format(), SourceFormat::Png);
        assert_eq!(raster.layout(), ChannelLayout::Rgb);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RasterImage::open(dir.path().join("absent.png"), 300).unwrap_err();
        assert!(matches!(err, DrawScanError::ImageDecode(_)));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let err = RasterImage::open(&path, 300).unwrap_err();
        assert!(matches!(err, DrawScanError::ImageDecode(_)));
    }

    #[test]
    fn pdf_path_is_not_a_raster() {
        let err = RasterImage::open("drawing.pdf", 300).unwrap_err();
        assert!(matches!(err, DrawScanError::UnsupportedFormat(_)));
    }
}
