//! Contrast enhancement on luminance: global histogram equalization and CLAHE.

use crate::{
    Effect, ScanEffectError, ScanEffectResult,
    base_effect::{Invert, luma},
    ensure_not_empty,
};
use derivative::Derivative;
use derive_setters::Setters;
use image::{GrayImage, Luma, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualizeMethod {
    Histogram,
    Clahe,
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct EqualizeConfig {
    #[derivative(Default(value = "EqualizeMethod::Clahe"))]
    method: EqualizeMethod,

    /// Histogram clip, relative to a uniform distribution. Ignored by `Histogram`.
    #[derivative(Default(value = "2.0"))]
    clip_limit: f32,

    /// CLAHE grid is `tiles x tiles`.
    #[derivative(Default(value = "8"))]
    tiles: u32,
}

impl EqualizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn histogram() -> Self {
        Self::default().with_method(EqualizeMethod::Histogram)
    }

    pub fn clahe() -> Self {
        Self::default().with_method(EqualizeMethod::Clahe)
    }
}

impl Effect for EqualizeConfig {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        ensure_not_empty(&image)?;

        if self.tiles == 0 {
            return Err(ScanEffectError::InvalidParameter(
                "clahe tile count must be at least 1".to_string(),
            ));
        }

        let gray = luma_image(&image);
        let equalized = match self.method {
            EqualizeMethod::Histogram => imageproc::contrast::equalize_histogram(&gray),
            EqualizeMethod::Clahe => clahe(&gray, self.clip_limit, self.tiles),
        };

        Ok(transfer_luma(image, &gray, &equalized))
    }
}

/// Invert followed by CLAHE, the radiograph look used for chest films.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct XrayEffectConfig {
    #[derivative(Default(value = "EqualizeConfig::clahe()"))]
    equalize: EqualizeConfig,
}

impl XrayEffectConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for XrayEffectConfig {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        let inverted = Invert.apply(image)?;
        self.equalize.apply(inverted)
    }
}

pub fn luma_image(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        Luma([luma(p[0], p[1], p[2]).round().clamp(0.0, 255.0) as u8])
    })
}

// Shift every channel by the luma delta so chroma differences survive.
fn transfer_luma(mut image: RgbaImage, before: &GrayImage, after: &GrayImage) -> RgbaImage {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let delta = after.get_pixel(x, y)[0] as i16 - before.get_pixel(x, y)[0] as i16;
        for i in 0..3 {
            pixel[i] = (pixel[i] as i16 + delta).clamp(0, 255) as u8;
        }
    }

    image
}

/// Contrast limited adaptive histogram equalization.
///
/// Each tile gets its own clipped-histogram lookup table; pixels blend the
/// tables of the four nearest tile centers. A `clip_limit` of zero or less
/// disables clipping.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let tiles_x = tiles.clamp(1, width.max(1));
    let tiles_y = tiles.clamp(1, height.max(1));

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = (ty * height / tiles_y, (ty + 1) * height / tiles_y);
        for tx in 0..tiles_x {
            let (x0, x1) = (tx * width / tiles_x, (tx + 1) * width / tiles_x);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            luts.push(tile_lut(&mut hist, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
        let v = gray.get_pixel(x, y)[0] as usize;
        let at = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;

        let top = at(tx0, ty0) * (1.0 - ax) + at(tx1, ty0) * ax;
        let bottom = at(tx0, ty1) * (1.0 - ax) + at(tx1, ty1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

fn neighbours(pos: u32, tile_size: f32, tiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile_size - 0.5;
    let t0 = f.floor().clamp(0.0, (tiles - 1) as f32) as u32;
    let t1 = (t0 + 1).min(tiles - 1);
    let weight = (f - t0 as f32).clamp(0.0, 1.0);
    (t0, t1, weight)
}

fn tile_lut(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }

        let per_bin = excess / 256;
        let residual = (excess % 256) as usize;
        for (i, bin) in hist.iter_mut().enumerate() {
            *bin += per_bin + u32::from(i < residual);
        }
    }

    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (value, bin) in lut.iter_mut().zip(hist.iter()) {
        cdf += bin;
        *value = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }

    lut
}
