use crate::{Effect, ScanEffectError, ScanEffectResult, ensure_not_empty};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;

/// BT.601 luma of an RGB triple.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Invert the colors of an image
#[derive(Debug, Clone, Copy, Default)]
pub struct Invert;

impl Effect for Invert {
    fn apply(&self, mut image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        for pixel in image.pixels_mut() {
            pixel[0] = 255 - pixel[0];
            pixel[1] = 255 - pixel[1];
            pixel[2] = 255 - pixel[2];
        }

        Ok(image)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GrayscaleConfig;

impl GrayscaleConfig {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for GrayscaleConfig {
    fn apply(&self, mut image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        for pixel in image.pixels_mut() {
            let gray = luma(pixel[0], pixel[1], pixel[2]).round().clamp(0.0, 255.0) as u8;
            pixel[0] = gray;
            pixel[1] = gray;
            pixel[2] = gray;
        }

        Ok(image)
    }
}

/// Linear contrast around mid-grey: `(v - 128) * factor + 128`
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ContrastConfig {
    #[derivative(Default(value = "1.0"))]
    factor: f32,
}

impl ContrastConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for ContrastConfig {
    fn apply(&self, mut image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(ScanEffectError::InvalidParameter(format!(
                "contrast factor must be non-negative, got {}",
                self.factor
            )));
        }

        for pixel in image.pixels_mut() {
            for i in 0..3 {
                let new_val = (pixel[i] as f32 - 128.0) * self.factor + 128.0;
                pixel[i] = new_val.round().clamp(0.0, 255.0) as u8;
            }
        }

        Ok(image)
    }
}

/// Scales the HSV value channel by `factor`.
///
/// Hue and saturation are kept, so this is an RGB scale capped where the
/// brightest channel reaches 255.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct BrightnessConfig {
    #[derivative(Default(value = "1.0"))]
    factor: f32,
}

impl BrightnessConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for BrightnessConfig {
    fn apply(&self, mut image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(ScanEffectError::InvalidParameter(format!(
                "brightness factor must be non-negative, got {}",
                self.factor
            )));
        }

        for pixel in image.pixels_mut() {
            let max = pixel[0].max(pixel[1]).max(pixel[2]);
            if max == 0 {
                continue;
            }

            let scale = self.factor.min(255.0 / max as f32);
            for i in 0..3 {
                pixel[i] = (pixel[i] as f32 * scale).round().clamp(0.0, 255.0) as u8;
            }
        }

        Ok(image)
    }
}

const MIN_SIGMA_BOUND: u32 = 16;

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct GaussianBlurConfig {
    #[derivative(Default(value = "1.1"))]
    sigma: f32,
}

impl GaussianBlurConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for GaussianBlurConfig {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(ScanEffectError::InvalidParameter(format!(
                "blur sigma must be a positive number, got {}",
                self.sigma
            )));
        }

        ensure_not_empty(&image)?;

        // Kernel length grows with sigma; past the image size it only averages.
        let max_sigma = image.width().max(image.height()).max(MIN_SIGMA_BOUND) as f32;
        if self.sigma > max_sigma {
            return Err(ScanEffectError::InvalidParameter(format!(
                "blur sigma {} exceeds {max_sigma} for a {}x{} image",
                self.sigma,
                image.width(),
                image.height()
            )));
        }

        Ok(imageproc::filter::gaussian_blur_f32(&image, self.sigma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_invert() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 100, 255, 42]));
        let out = Invert.apply(image).unwrap();
        assert_eq!(out.get_pixel(1, 1), &Rgba([255, 155, 0, 42]));
    }

    #[test]
    fn test_grayscale() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let out = GrayscaleConfig::new().apply(image).unwrap();
        let p = out.get_pixel(0, 0);
        assert_eq!(p[0], 76);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn test_contrast() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([100, 128, 200, 9]));
        let out = ContrastConfig::new().with_factor(2.0).apply(image).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([72, 128, 255, 9]));
    }

    #[test]
    fn test_contrast_rejects_negative() {
        let image = RgbaImage::new(1, 1);
        assert!(ContrastConfig::new().with_factor(-0.5).apply(image).is_err());
    }

    #[test]
    fn test_brightness_keeps_hue() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([100, 50, 20, 255]));
        let out = BrightnessConfig::new().with_factor(1.5).apply(image).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgba([150, 75, 30, 255]));
    }

    #[test]
    fn test_brightness_caps_at_white() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([200, 80, 0, 255]));
        let out = BrightnessConfig::new().with_factor(2.0).apply(image).unwrap();
        let p = out.get_pixel(0, 0);
        assert_eq!(p[0], 255);
        assert_eq!(p[1], 102);
        assert_eq!(p[2], 0);
    }

    #[test]
    fn test_blur_keeps_flat_image() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([90, 90, 90, 255]));
        let out = GaussianBlurConfig::new().apply(image.clone()).unwrap();
        assert_eq!(out.dimensions(), image.dimensions());
        let p = out.get_pixel(4, 4);
        assert!((p[0] as i32 - 90).abs() <= 1);
        assert!((p[3] as i32 - 255).abs() <= 1);
    }

    #[test]
    fn test_blur_rejects_unbounded_sigma() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        for sigma in [f32::INFINITY, f32::NAN, 1e12, 16.5, 0.0, -1.0] {
            let err = GaussianBlurConfig::new()
                .with_sigma(sigma)
                .apply(image.clone())
                .unwrap_err();
            assert!(matches!(err, ScanEffectError::InvalidParameter(_)), "sigma {sigma}");
        }

        assert!(GaussianBlurConfig::new().with_sigma(16.0).apply(image).is_ok());

        let large = RgbaImage::from_pixel(40, 10, Rgba([90, 90, 90, 255]));
        assert!(GaussianBlurConfig::new().with_sigma(8.0).apply(large.clone()).is_ok());
        assert!(GaussianBlurConfig::new().with_sigma(41.0).apply(large).is_err());
    }
}
