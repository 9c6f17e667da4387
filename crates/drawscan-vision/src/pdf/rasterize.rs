// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rasterization. The engine never renders PDF itself: a `PdfRasterizer`
// writes page 1 as a PNG into a per-call temporary file, which is decoded and
// then removed on every exit path.

use std::path::{Path, PathBuf};
use std::process::Command;

use drawscan_core::SourceFormat;
use drawscan_core::error::{DrawScanError, Result};
use lopdf::Document;
use tracing::{debug, info, instrument};

use crate::image::RasterImage;

/// Renders the first page of a PDF to a PNG file.
pub trait PdfRasterizer: Send + Sync {
    /// Write page 1 of `pdf`, rendered at `dpi`, as a PNG at `output`.
    fn rasterize_first_page(&self, pdf: &Path, dpi: u32, output: &Path) -> Result<()>;
}

/// Rasterizer backed by poppler's `pdftoppm` command-line tool.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl PdftoppmRasterizer {
    /// Use `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
        }
    }

    /// Use a specific `pdftoppm` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfRasterizer for PdftoppmRasterizer {
    fn rasterize_first_page(&self, pdf: &Path, dpi: u32, output: &Path) -> Result<()> {
        // pdftoppm appends ".png" to the output root it is given.
        let root = output.with_extension("");
        let status = Command::new(&self.program)
            .arg("-png")
            .arg("-singlefile")
            .args(["-f", "1", "-l", "1"])
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf)
            .arg(&root)
            .status()
            .map_err(|err| {
                DrawScanError::Rasterize(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    err
                ))
            })?;

        if !status.success() {
            return Err(DrawScanError::Rasterize(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }
        Ok(())
    }
}

/// Rasterize the first page of `pdf` at `dpi` and decode it.
///
/// The PDF is opened with `lopdf` first so that corrupt or page-less files
/// fail as decode errors before any external tool runs.
#[instrument(skip(rasterizer), fields(path = %pdf.display()))]
pub fn rasterize_first_page(
    pdf: &Path,
    rasterizer: &dyn PdfRasterizer,
    dpi: u32,
) -> Result<RasterImage> {
    let document = Document::load(pdf).map_err(|err| {
        DrawScanError::ImageDecode(format!("failed to open PDF {}: {}", pdf.display(), err))
    })?;
    let pages = document.get_pages().len();
    if pages == 0 {
        return Err(DrawScanError::ImageDecode(format!(
            "PDF {} has no pages",
            pdf.display()
        )));
    }
    debug!(pages, "PDF inspected");

    // Dropping the handle deletes the file, including on the error paths below.
    let scratch = tempfile::Builder::new()
        .prefix("drawscan-page-")
        .suffix(".png")
        .tempfile()?;

    rasterizer.rasterize_first_page(pdf, dpi, scratch.path())?;

    let decoded = image::open(scratch.path()).map_err(|err| {
        DrawScanError::ImageDecode(format!(
            "failed to decode rasterized page of {}: {}",
            pdf.display(),
            err
        ))
    })?;
    let raster = RasterImage::from_dynamic(decoded, dpi, SourceFormat::Pdf)?;

    info!(
        width = raster.width(),
        height = raster.height(),
        dpi,
        "PDF first page rasterized"
    );
    Ok(raster)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use lopdf::{Object, dictionary};
    use std::sync::Mutex;

    /// Writes a blank page and remembers where it wrote it.
    pub(crate) struct FakeRasterizer {
        pub(crate) written: Mutex<Vec<PathBuf>>,
        pub(crate) fail: bool,
    }

    impl FakeRasterizer {
        pub(crate) fn new(fail: bool) -> Self {
            Self {
                written: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl PdfRasterizer for FakeRasterizer {
        fn rasterize_first_page(&self, _pdf: &Path, _dpi: u32, output: &Path) -> Result<()> {
            self.written.lock().unwrap().push(output.to_path_buf());
            if self.fail {
                return Err(DrawScanError::Rasterize("renderer crashed".into()));
            }
            GrayImage::from_pixel(60, 80, Luma([255u8]))
                .save(output)
                .map_err(|err| DrawScanError::Rasterize(err.to_string()))
        }
    }

    /// Write a one-page PDF to `path`.
    pub(crate) fn write_single_page_pdf(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn first_page_is_decoded_and_scratch_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("sheet.pdf");
        write_single_page_pdf(&pdf);

        let rasterizer = FakeRasterizer::new(false);
        let raster = rasterize_first_page(&pdf, &rasterizer, 300).unwrap();

        assert_eq!((raster.width(), raster.height()), (60, 80));
        assert_eq!(raster.dpi(), 300);
        assert_eq!(raster.format(), SourceFormat::Pdf);

        let written = rasterizer.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert!(!written[0].exists(), "scratch file must be deleted");
    }

    #[test]
    fn scratch_file_removed_when_rasterizer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("sheet.pdf");
        write_single_page_pdf(&pdf);

        let rasterizer = FakeRasterizer::new(true);
        let err = rasterize_first_page(&pdf, &rasterizer, 300).unwrap_err();
        assert!(matches!(err, DrawScanError::Rasterize(_)));

        let written = rasterizer.written.lock().unwrap();
        assert!(!written[0].exists());
    }

    #[test]
    fn each_call_gets_a_distinct_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("sheet.pdf");
        write_single_page_pdf(&pdf);

        let rasterizer = FakeRasterizer::new(false);
        rasterize_first_page(&pdf, &rasterizer, 300).unwrap();
        rasterize_first_page(&pdf, &rasterizer, 300).unwrap();

        let written = rasterizer.written.lock().unwrap();
        assert_ne!(written[0], written[1]);
    }

    #[test]
    fn corrupt_pdf_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("broken.pdf");
        std::fs::write(&pdf, b"%PDF-1.5 garbage").unwrap();

        let rasterizer = FakeRasterizer::new(false);
        let err = rasterize_first_page(&pdf, &rasterizer, 300).unwrap_err();
        assert!(matches!(err, DrawScanError::ImageDecode(_)));
        assert!(rasterizer.written.lock().unwrap().is_empty());
    }
}
