use crate::{
    ScanEffect,
    base_effect::{GaussianBlurConfig, GrayscaleConfig},
    enhance::{EqualizeConfig, XrayEffectConfig},
    xray::XrayConfig,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ScanPreset {
    None = 0,
    Xray,
    Invert,
    Grayscale,
    Equalize,
    Clahe,
    XrayEnhanced,
    Blur,
}

impl ScanPreset {
    pub fn name(&self) -> &'static str {
        match self {
            ScanPreset::None => "None",
            ScanPreset::Xray => "X-Ray",
            ScanPreset::Invert => "Invert",
            ScanPreset::Grayscale => "Grayscale",
            ScanPreset::Equalize => "Equalize",
            ScanPreset::Clahe => "CLAHE",
            ScanPreset::XrayEnhanced => "X-Ray Enhanced",
            ScanPreset::Blur => "Blur",
        }
    }

    /// `None` for the pass-through preset.
    pub fn effect(&self) -> Option<ScanEffect> {
        match self {
            ScanPreset::None => None,
            ScanPreset::Xray => Some(ScanEffect::Xray(XrayConfig::new())),
            ScanPreset::Invert => Some(ScanEffect::Invert),
            ScanPreset::Grayscale => Some(ScanEffect::Grayscale(GrayscaleConfig::new())),
            ScanPreset::Equalize => Some(ScanEffect::Equalize(EqualizeConfig::histogram())),
            ScanPreset::Clahe => Some(ScanEffect::Equalize(EqualizeConfig::clahe())),
            ScanPreset::XrayEnhanced => Some(ScanEffect::XrayEnhanced(XrayEffectConfig::new())),
            ScanPreset::Blur => Some(ScanEffect::GaussianBlur(GaussianBlurConfig::new())),
        }
    }

    pub fn all_presets() -> &'static [ScanPreset] {
        &[
            ScanPreset::Xray,
            ScanPreset::Invert,
            ScanPreset::Grayscale,
            ScanPreset::Equalize,
            ScanPreset::Clahe,
            ScanPreset::XrayEnhanced,
            ScanPreset::Blur,
        ]
    }
}
