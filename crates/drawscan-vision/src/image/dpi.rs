// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Declared-resolution lookup. PNG and TIFF go through their format crates;
// JPEG (JFIF APP0) and BMP (BITMAPINFOHEADER) carry the density in a few
// fixed header bytes which are read directly.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use drawscan_core::SourceFormat;
use tiff::decoder::ifd::Value;
use tiff::tags::Tag;
use tracing::debug;

const INCHES_PER_METRE: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

/// Read the horizontal DPI a file declares, if any.
///
/// Metadata problems are never fatal: anything unreadable yields `None` and
/// the caller falls back to its standard DPI.
pub fn read_dpi(path: &Path, format: SourceFormat) -> Option<u32> {
    let dpi = match format {
        SourceFormat::Png => png_dpi(path),
        SourceFormat::Tiff => tiff_dpi(path),
        SourceFormat::Jpeg => std::fs::read(path).ok().and_then(|b| jfif_dpi(&b)),
        SourceFormat::Bmp => std::fs::read(path).ok().and_then(|b| bmp_dpi(&b)),
        SourceFormat::Pdf => None,
    };
    debug!(?format, ?dpi, "DPI metadata read");
    dpi.filter(|&d| d > 0)
}

fn png_dpi(path: &Path) -> Option<u32> {
    let file = File::open(path).ok()?;
    let reader = png::Decoder::new(BufReader::new(file)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some((dims.xppu as f64 * INCHES_PER_METRE).round() as u32),
        png::Unit::Unspecified => None,
    }
}

fn tiff_dpi(path: &Path) -> Option<u32> {
    let file = File::open(path).ok()?;
    let mut decoder = tiff::decoder::Decoder::new(BufReader::new(file)).ok()?;
    let resolution = rational_to_f64(decoder.find_tag(Tag::XResolution).ok()??)?;
    // ResolutionUnit: 1 = none, 2 = inch (default), 3 = centimetre.
    let unit = match decoder.find_tag(Tag::ResolutionUnit).ok().flatten() {
        Some(Value::Short(u)) => u,
        Some(Value::Unsigned(u)) => u as u16,
        _ => 2,
    };
    match unit {
        2 => Some(resolution.round() as u32),
        3 => Some((resolution * CM_PER_INCH).round() as u32),
        _ => None,
    }
}

fn rational_to_f64(value: Value) -> Option<f64> {
    match value {
        Value::Rational(n, d) if d != 0 => Some(n as f64 / d as f64),
        Value::Short(v) => Some(v as f64),
        Value::Unsigned(v) => Some(v as f64),
        Value::List(mut values) if values.len() == 1 => rational_to_f64(values.remove(0)),
        _ => None,
    }
}

/// Density from a JFIF APP0 segment. Units: 1 = dots/inch, 2 = dots/cm.
fn jfif_dpi(bytes: &[u8]) -> Option<u32> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        // Start of scan or end of image: no more header segments.
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 {
            return None;
        }
        let body = bytes.get(pos + 4..pos + 2 + len)?;
        if marker == 0xE0 && body.len() >= 12 && body.starts_with(b"JFIF\0") {
            let units = body[7];
            let x_density = u16::from_be_bytes([body[8], body[9]]) as f64;
            return match units {
                1 => Some(x_density.round() as u32),
                2 => Some((x_density * CM_PER_INCH).round() as u32),
                _ => None,
            };
        }
        pos += 2 + len;
    }
    None
}

/// Horizontal pixels-per-metre from a BMP info header.
fn bmp_dpi(bytes: &[u8]) -> Option<u32> {
    if !bytes.starts_with(b"BM") {
        return None;
    }
    let header_size = u32::from_le_bytes(bytes.get(14..18)?.try_into().ok()?);
    if header_size < 40 {
        return None;
    }
    let ppm = i32::from_le_bytes(bytes.get(38..42)?.try_into().ok()?);
    (ppm > 0).then(|| (ppm as f64 * INCHES_PER_METRE).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jfif_header(units: u8, density: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(b"JFIF\0");
        bytes.extend_from_slice(&[1, 1, units]);
        bytes.extend_from_slice(&density.to_be_bytes());
        bytes.extend_from_slice(&density.to_be_bytes());
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn jfif_density_in_inches() {
        assert_eq!(jfif_dpi(&jfif_header(1, 300)), Some(300));
    }

    #[test]
    fn jfif_density_in_centimetres() {
        // 118 dots/cm ~= 300 dpi.
        assert_eq!(jfif_dpi(&jfif_header(2, 118)), Some(300));
    }

    #[test]
    fn jfif_aspect_only_density_is_ignored() {
        assert_eq!(jfif_dpi(&jfif_header(0, 1)), None);
    }

    #[test]
    fn truncated_jpeg_yields_none() {
        assert_eq!(jfif_dpi(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), None);
        assert_eq!(jfif_dpi(b"GIF89a"), None);
    }

    #[test]
    fn bmp_pixels_per_metre() {
        let mut bytes = vec![0u8; 54];
        bytes[0..2].copy_from_slice(b"BM");
        bytes[14..18].copy_from_slice(&40u32.to_le_bytes());
        bytes[38..42].copy_from_slice(&11811i32.to_le_bytes());
        assert_eq!(bmp_dpi(&bytes), Some(300));
    }

    #[test]
    fn png_phys_chunk_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dense.png");
        let file = File::create(&path).unwrap();
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), 2, 2);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: 7874,
            yppu: 7874,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&[0, 255, 255, 0]).unwrap();
        writer.finish().unwrap();

        assert_eq!(read_dpi(&path, SourceFormat::Png), Some(200));
    }

    fn write_tiff(path: &Path, unit: tiff::tags::ResolutionUnit, per_unit: u32) {
        use tiff::encoder::{Rational, TiffEncoder, colortype};

        let mut file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(&mut file).unwrap();
        let mut image = encoder.new_image::<colortype::Gray8>(2, 2).unwrap();
        image.resolution(unit, Rational { n: per_unit, d: 1 });
        image.write_data(&[0, 255, 255, 0]).unwrap();
    }

    #[test]
    fn tiff_resolution_in_inches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inch.tif");
        write_tiff(&path, tiff::tags::ResolutionUnit::Inch, 200);
        assert_eq!(read_dpi(&path, SourceFormat::Tiff), Some(200));
    }

    #[test]
    fn tiff_resolution_in_centimetres() {
        // 118 px/cm ~= 300 dpi.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cm.tif");
        write_tiff(&path, tiff::tags::ResolutionUnit::Centimeter, 118);
        assert_eq!(read_dpi(&path, SourceFormat::Tiff), Some(300));
    }

    #[test]
    fn tiff_rational_values_are_converted() {
        assert_eq!(rational_to_f64(Value::Rational(600, 2)), Some(300.0));
        assert_eq!(rational_to_f64(Value::Rational(1, 0)), None);
        assert_eq!(
            rational_to_f64(Value::List(vec![Value::Short(150)])),
            Some(150.0)
        );
    }

    #[test]
    fn png_without_phys_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        image::GrayImage::new(3, 3).save(&path).unwrap();
        assert_eq!(read_dpi(&path, SourceFormat::Png), None);
    }
}
