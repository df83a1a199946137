//! Training-set augmentation. `intensity` runs from 0.0 to 1.0 and maps onto
//! each kind's own parameter range.

use crate::{
    Effect, ScanEffectError, ScanEffectResult,
    base_effect::{BrightnessConfig, ContrastConfig, GaussianBlurConfig},
    ensure_not_empty,
};
use derivative::Derivative;
use derive_setters::Setters;
use image::{Rgba, RgbaImage, imageops::FilterType};
use imageproc::geometric_transformations::{Interpolation, Projection, rotate_about_center, warp};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rand::{Rng, SeedableRng, rngs::StdRng};

const FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AugmentationKind {
    Rotation = 0,
    Flip,
    Brightness,
    Contrast,
    Noise,
    Blur,
    Zoom,
    Translation,
}

impl AugmentationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AugmentationKind::Rotation => "rotation",
            AugmentationKind::Flip => "flip",
            AugmentationKind::Brightness => "brightness",
            AugmentationKind::Contrast => "contrast",
            AugmentationKind::Noise => "noise",
            AugmentationKind::Blur => "blur",
            AugmentationKind::Zoom => "zoom",
            AugmentationKind::Translation => "translation",
        }
    }

    pub fn all_kinds() -> &'static [AugmentationKind] {
        &[
            AugmentationKind::Rotation,
            AugmentationKind::Flip,
            AugmentationKind::Brightness,
            AugmentationKind::Contrast,
            AugmentationKind::Noise,
            AugmentationKind::Blur,
            AugmentationKind::Zoom,
            AugmentationKind::Translation,
        ]
    }
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct AugmentConfig {
    #[derivative(Default(value = "AugmentationKind::Rotation"))]
    kind: AugmentationKind,

    #[derivative(Default(value = "0.5"))]
    intensity: f32,

    /// Fixed seed for reproducible output; OS entropy otherwise.
    #[setters(strip_option)]
    seed: Option<u64>,
}

impl AugmentConfig {
    pub fn new(kind: AugmentationKind) -> Self {
        Self::default().with_kind(kind)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl Effect for AugmentConfig {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        if !(0.0..=1.0).contains(&self.intensity) {
            return Err(ScanEffectError::InvalidParameter(format!(
                "augmentation intensity must be within 0.0 - 1.0, got {}",
                self.intensity
            )));
        }

        ensure_not_empty(&image)?;

        let intensity = self.intensity;
        let mut rng = self.rng();

        match self.kind {
            AugmentationKind::Rotation => {
                // Positive angles turn counter-clockwise.
                let degrees = (intensity - 0.5) * 60.0;
                Ok(rotate_about_center(
                    &image,
                    -degrees.to_radians(),
                    Interpolation::Bilinear,
                    FILL,
                ))
            }
            AugmentationKind::Flip => {
                if rng.random_bool(0.5) {
                    Ok(image::imageops::flip_horizontal(&image))
                } else {
                    Ok(image::imageops::flip_vertical(&image))
                }
            }
            AugmentationKind::Brightness => BrightnessConfig::new()
                .with_factor(0.5 + intensity)
                .apply(image),
            AugmentationKind::Contrast => ContrastConfig::new()
                .with_factor(0.5 + intensity)
                .apply(image),
            AugmentationKind::Noise => add_noise(image, intensity as f64 * 25.0, rng.random()),
            AugmentationKind::Blur => {
                let kernel = (1.0 + intensity * 4.0) as u32 | 1;
                if kernel <= 1 {
                    return Ok(image);
                }

                let sigma = 0.3 * ((kernel - 1) as f32 * 0.5 - 1.0) + 0.8;
                GaussianBlurConfig::new().with_sigma(sigma).apply(image)
            }
            AugmentationKind::Zoom => Ok(zoom(&image, 0.8 + intensity * 0.4)),
            AugmentationKind::Translation => {
                let max = (intensity * image.width().min(image.height()) as f32 * 0.2) as i32;
                let tx = rng.random_range(-max..=max);
                let ty = rng.random_range(-max..=max);
                let projection = Projection::translate(tx as f32, ty as f32);
                Ok(warp(&image, &projection, Interpolation::Nearest, FILL))
            }
        }
    }
}

/// Chain `count` random augmentations with intensities in 0.3 - 0.7.
pub fn random_augmentation(
    mut image: RgbaImage,
    count: usize,
    seed: Option<u64>,
) -> ScanEffectResult<RgbaImage> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let kinds = AugmentationKind::all_kinds();
    for _ in 0..count {
        let kind = kinds[rng.random_range(0..kinds.len())];
        let intensity = rng.random_range(0.3..=0.7);
        log::debug!("augment: {} at {intensity:.2}", kind.name());

        image = AugmentConfig::new(kind)
            .with_intensity(intensity)
            .with_seed(rng.random())
            .apply(image)?;
    }

    Ok(image)
}

fn add_noise(image: RgbaImage, sigma: f64, seed: u64) -> ScanEffectResult<RgbaImage> {
    if sigma <= 0.0 {
        return Ok(image);
    }

    let mut noisy = imageproc::noise::gaussian_noise(&image, 0.0, sigma, seed);
    for (dst, src) in noisy.pixels_mut().zip(image.pixels()) {
        dst[3] = src[3];
    }

    Ok(noisy)
}

fn zoom(image: &RgbaImage, factor: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let new_width = ((width as f32 * factor) as u32).max(1);
    let new_height = ((height as f32 * factor) as u32).max(1);
    if (new_width, new_height) == (width, height) {
        return image.clone();
    }

    let resized = image::imageops::resize(image, new_width, new_height, FilterType::Triangle);
    if factor > 1.0 {
        let x = (new_width - width) / 2;
        let y = (new_height - height) / 2;
        image::imageops::crop_imm(&resized, x, y, width, height).to_image()
    } else {
        let mut canvas = RgbaImage::from_pixel(width, height, FILL);
        let x = (width - new_width) / 2;
        let y = (height - new_height) / 2;
        image::imageops::replace(&mut canvas, &resized, x as i64, y as i64);
        canvas
    }
}
