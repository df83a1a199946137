pub mod augment;
pub mod base_effect;
pub mod buffer;
pub mod codec;
pub mod enhance;
pub mod preprocess;
pub mod preset;
pub mod quality;
pub mod workbench;
pub mod xray;

use image::RgbaImage;

pub use buffer::PixelBuffer;
pub use preset::ScanPreset;
pub use workbench::Workbench;
pub use xray::{XrayConfig, xray_transform};

pub type ScanEffectResult<T> = Result<T, ScanEffectError>;

#[derive(thiserror::Error, Debug)]
pub enum ScanEffectError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("File too large: {size} bytes (maximum {max} bytes)")]
    FileTooLarge { size: usize, max: usize },
    #[error("Image dimensions too large: {width}x{height} (maximum {max}x{max})")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },
    #[error("Invalid data url: {0}")]
    InvalidDataUrl(String),
    #[error("No image uploaded")]
    NoImage,
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// An effect consumes an image and returns a freshly written one.
pub trait Effect {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage>;
}

#[derive(Debug, Clone)]
pub enum ScanEffect {
    // Base effects
    Invert,
    Grayscale(base_effect::GrayscaleConfig),
    Contrast(base_effect::ContrastConfig),
    Brightness(base_effect::BrightnessConfig),
    GaussianBlur(base_effect::GaussianBlurConfig),

    // Radiograph effects
    Xray(xray::XrayConfig),
    XrayEnhanced(enhance::XrayEffectConfig),
    Equalize(enhance::EqualizeConfig),

    // Augmentation
    Augment(augment::AugmentConfig),
}

impl Effect for ScanEffect {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        match self {
            // Base effects
            ScanEffect::Invert => base_effect::Invert.apply(image),
            ScanEffect::Grayscale(config) => config.apply(image),
            ScanEffect::Contrast(config) => config.apply(image),
            ScanEffect::Brightness(config) => config.apply(image),
            ScanEffect::GaussianBlur(config) => config.apply(image),

            // Radiograph effects
            ScanEffect::Xray(config) => config.apply(image),
            ScanEffect::XrayEnhanced(config) => config.apply(image),
            ScanEffect::Equalize(config) => config.apply(image),

            // Augmentation
            ScanEffect::Augment(config) => config.apply(image),
        }
    }
}

pub(crate) fn ensure_not_empty(image: &RgbaImage) -> ScanEffectResult<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ScanEffectError::InvalidInput(format!(
            "image has zero area ({}x{})",
            image.width(),
            image.height()
        )));
    }

    Ok(())
}
