// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Luma-channel filters used by the enhancement pipeline, plus the YCbCr
// split/merge that isolates the luma channel from colour.

use drawscan_core::config::EnhanceConfig;
use drawscan_core::error::{DrawScanError, Result};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::filter::{bilateral_filter, gaussian_blur_f32};
use tracing::debug;

/// One step applied to the luma channel.
pub trait LumaFilter: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    fn apply(&self, luma: &GrayImage) -> Result<GrayImage>;
}

/// The standard filter chain: CLAHE, bilateral denoise, unsharp mask, gamma.
pub fn standard_filters(config: &EnhanceConfig) -> Vec<Box<dyn LumaFilter>> {
    vec![
        Box::new(Clahe {
            clip_limit: config.clahe_clip_limit,
            tiles: config.clahe_tiles,
        }),
        Box::new(Bilateral {
            window: config.bilateral_window,
            sigma_color: config.bilateral_sigma_color,
            sigma_spatial: config.bilateral_sigma_spatial,
        }),
        Box::new(UnsharpMask {
            sigma: config.unsharp_sigma,
            amount: config.unsharp_amount,
        }),
        Box::new(Gamma::new(config.gamma)),
    ]
}

fn ensure_non_empty(luma: &GrayImage, step: &'static str) -> Result<()> {
    if luma.width() == 0 || luma.height() == 0 {
        return Err(DrawScanError::enhancement(step, "empty luma channel"));
    }
    Ok(())
}

// -- Contrast-limited adaptive histogram equalization -------------------------

/// Equalizes each tile's histogram with a clipped CDF and blends neighbouring
/// tile mappings bilinearly.
#[derive(Debug, Clone)]
pub struct Clahe {
    /// Histogram bins are clipped at `clip_limit * tile_pixels / 256`.
    pub clip_limit: f32,
    /// Tiles per axis.
    pub tiles: u32,
}

impl Clahe {
    fn tile_lut(&self, luma: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32) -> [u8; 256] {
        let mut histogram = [0u32; 256];
        for y in y0..y1 {
            for x in x0..x1 {
                histogram[luma.get_pixel(x, y).0[0] as usize] += 1;
            }
        }
        let area = (x1 - x0) * (y1 - y0);

        let limit = ((self.clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in histogram.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let share = excess / 256;
        let remainder = (excess % 256) as usize;
        for (i, bin) in histogram.iter_mut().enumerate() {
            *bin += share + u32::from(i < remainder);
        }

        let mut lut = [0u8; 256];
        let mut cdf = 0u32;
        for (i, &count) in histogram.iter().enumerate() {
            cdf += count;
            lut[i] = ((cdf as f32 * 255.0 / area as f32).round()).min(255.0) as u8;
        }
        lut
    }
}

impl LumaFilter for Clahe {
    fn name(&self) -> &'static str {
        "clahe"
    }

    fn apply(&self, luma: &GrayImage) -> Result<GrayImage> {
        ensure_non_empty(luma, self.name())?;
        if self.tiles == 0 || self.clip_limit <= 0.0 {
            return Err(DrawScanError::enhancement(
                self.name(),
                "tiles and clip limit must be positive",
            ));
        }

        let (w, h) = luma.dimensions();
        let tiles_x = self.tiles.min(w);
        let tiles_y = self.tiles.min(h);

        let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            let (y0, y1) = (ty * h / tiles_y, (ty + 1) * h / tiles_y);
            for tx in 0..tiles_x {
                let (x0, x1) = (tx * w / tiles_x, (tx + 1) * w / tiles_x);
                luts.push(self.tile_lut(luma, x0, x1, y0, y1));
            }
        }

        let tile_w = w as f32 / tiles_x as f32;
        let tile_h = h as f32 / tiles_y as f32;
        // Grid coordinate of a pixel relative to tile centres: returns the
        // lower tile index, the upper tile index, and the blend weight.
        let locate = |pos: u32, size: f32, count: u32| -> (usize, usize, f32) {
            let g = (pos as f32 + 0.5) / size - 0.5;
            if g <= 0.0 {
                return (0, 0, 0.0);
            }
            let lo = (g.floor() as u32).min(count - 1);
            let hi = (lo + 1).min(count - 1);
            (lo as usize, hi as usize, (g - lo as f32).clamp(0.0, 1.0))
        };

        let stride = tiles_x as usize;
        let out = GrayImage::from_fn(w, h, |x, y| {
            let v = luma.get_pixel(x, y).0[0] as usize;
            let (tx0, tx1, ax) = locate(x, tile_w, tiles_x);
            let (ty0, ty1, ay) = locate(y, tile_h, tiles_y);
            let top = luts[ty0 * stride + tx0][v] as f32 * (1.0 - ax)
                + luts[ty0 * stride + tx1][v] as f32 * ax;
            let bottom = luts[ty1 * stride + tx0][v] as f32 * (1.0 - ax)
                + luts[ty1 * stride + tx1][v] as f32 * ax;
            Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
        });
        debug!(tiles_x, tiles_y, "CLAHE applied");
        Ok(out)
    }
}

// -- Bilateral denoise ---------------------------------------------------------

/// Edge-preserving smoothing: neighbours are weighted by both spatial
/// distance and intensity difference.
#[derive(Debug, Clone)]
pub struct Bilateral {
    /// Window diameter in pixels (odd).
    pub window: u32,
    pub sigma_color: f32,
    pub sigma_spatial: f32,
}

impl LumaFilter for Bilateral {
    fn name(&self) -> &'static str {
        "bilateral"
    }

    fn apply(&self, luma: &GrayImage) -> Result<GrayImage> {
        ensure_non_empty(luma, self.name())?;
        if self.window % 2 == 0 || self.sigma_color <= 0.0 || self.sigma_spatial <= 0.0 {
            return Err(DrawScanError::enhancement(
                self.name(),
                format!(
                    "window {} must be odd and sigmas positive",
                    self.window
                ),
            ));
        }

        Ok(bilateral_filter(
            luma,
            self.window,
            self.sigma_color,
            self.sigma_spatial,
        ))
    }
}

// -- Unsharp mask --------------------------------------------------------------

/// `amount * luma + (1 - amount) * gaussian(luma)`: with `amount > 1` the
/// blurred copy is subtracted, boosting edge contrast.
#[derive(Debug, Clone)]
pub struct UnsharpMask {
    pub sigma: f32,
    pub amount: f32,
}

impl LumaFilter for UnsharpMask {
    fn name(&self) -> &'static str {
        "unsharp_mask"
    }

    fn apply(&self, luma: &GrayImage) -> Result<GrayImage> {
        ensure_non_empty(luma, self.name())?;
        if self.sigma <= 0.0 {
            return Err(DrawScanError::enhancement(self.name(), "sigma must be positive"));
        }
        let blurred = gaussian_blur_f32(luma, self.sigma);
        let (w, h) = luma.dimensions();
        Ok(GrayImage::from_fn(w, h, |x, y| {
            let original = luma.get_pixel(x, y).0[0] as f32;
            let soft = blurred.get_pixel(x, y).0[0] as f32;
            let v = self.amount * original + (1.0 - self.amount) * soft;
            Luma([v.round().clamp(0.0, 255.0) as u8])
        }))
    }
}

// -- Gamma -----------------------------------------------------------------------

/// Fixed gamma correction through a precomputed lookup table.
#[derive(Debug, Clone)]
pub struct Gamma {
    gamma: f32,
    lut: [u8; 256],
}

impl Gamma {
    pub fn new(gamma: f32) -> Self {
        let mut lut = [0u8; 256];
        if gamma > 0.0 && gamma.is_finite() {
            let inverse = 1.0 / gamma;
            for (i, entry) in lut.iter_mut().enumerate() {
                *entry = ((i as f32 / 255.0).powf(inverse) * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
        Self { gamma, lut }
    }
}

impl LumaFilter for Gamma {
    fn name(&self) -> &'static str {
        "gamma"
    }

    fn apply(&self, luma: &GrayImage) -> Result<GrayImage> {
        ensure_non_empty(luma, self.name())?;
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(DrawScanError::enhancement(
                self.name(),
                format!("gamma {} must be positive", self.gamma),
            ));
        }
        let mut out = luma.clone();
        for pixel in out.pixels_mut() {
            pixel.0[0] = self.lut[pixel.0[0] as usize];
        }
        Ok(out)
    }
}

// -- Luma / chroma split ---------------------------------------------------------

/// An image separated into a luma plane, optional chroma planes (absent for
/// grayscale input), and an optional alpha plane.
pub(crate) struct LumaChroma {
    pub(crate) luma: GrayImage,
    chroma: Option<(GrayImage, GrayImage)>,
    alpha: Option<GrayImage>,
}

impl LumaChroma {
    /// Split using full-range BT.601 YCbCr.
    pub(crate) fn split(image: &DynamicImage) -> Self {
        let color = image.color();
        let alpha = color.has_alpha().then(|| {
            let rgba = image.to_rgba8();
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                Luma([rgba.get_pixel(x, y).0[3]])
            })
        });

        if !color.has_color() {
            return Self {
                luma: image.to_luma8(),
                chroma: None,
                alpha,
            };
        }

        let rgb = image.to_rgb8();
        let (w, h) = rgb.dimensions();
        let mut luma = GrayImage::new(w, h);
        let mut cb = GrayImage::new(w, h);
        let mut cr = GrayImage::new(w, h);
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let [r, g, b] = pixel.0.map(f32::from);
            let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
            luma.put_pixel(x, y, Luma([to_u8(0.299 * r + 0.587 * g + 0.114 * b)]));
            cb.put_pixel(
                x,
                y,
                Luma([to_u8(128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b)]),
            );
            cr.put_pixel(
                x,
                y,
                Luma([to_u8(128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b)]),
            );
        }

        Self {
            luma,
            chroma: Some((cb, cr)),
            alpha,
        }
    }

    /// Recombine into the colour model the image was split from.
    pub(crate) fn merge(self) -> Result<DynamicImage> {
        let (w, h) = self.luma.dimensions();
        let Some((cb, cr)) = self.chroma else {
            return Ok(match self.alpha {
                None => DynamicImage::ImageLuma8(self.luma),
                Some(alpha) => {
                    let la = image::ImageBuffer::from_fn(w, h, |x, y| {
                        image::LumaA([self.luma.get_pixel(x, y).0[0], alpha.get_pixel(x, y).0[0]])
                    });
                    DynamicImage::ImageLumaA8(la)
                }
            });
        };
        if cb.dimensions() != (w, h) || cr.dimensions() != (w, h) {
            return Err(DrawScanError::enhancement(
                "merge",
                "chroma planes do not match luma dimensions",
            ));
        }

        let rgb = RgbImage::from_fn(w, h, |x, y| {
            let yv = self.luma.get_pixel(x, y).0[0] as f32;
            let cbv = cb.get_pixel(x, y).0[0] as f32 - 128.0;
            let crv = cr.get_pixel(x, y).0[0] as f32 - 128.0;
            let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
            Rgb([
                to_u8(yv + 1.402 * crv),
                to_u8(yv - 0.344_136 * cbv - 0.714_136 * crv),
                to_u8(yv + 1.772 * cbv),
            ])
        });

        Ok(match self.alpha {
            None => DynamicImage::ImageRgb8(rgb),
            Some(alpha) => DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Rgba([r, g, b, alpha.get_pixel(x, y).0[0]])
            })),
        })
    }
}
