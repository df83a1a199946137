use crate::{Effect, PixelBuffer, ScanEffectError, ScanEffectResult, buffer};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;

pub const XRAY_CONTRAST: f32 = 1.5;

/// Inverts each color channel and stretches it around mid-grey:
/// `out = clamp((255 - v - 128) * 1.5 + 128)`. Alpha is copied through.
///
/// The input slice is left untouched; a fresh buffer is returned.
pub fn xray_transform(width: u32, height: u32, rgba: &[u8]) -> ScanEffectResult<PixelBuffer> {
    buffer::validate_rgba(width, height, rgba)?;

    let mut out = rgba.to_vec();
    apply_in_place(&mut out, XRAY_CONTRAST);
    PixelBuffer::new(width, height, out)
}

/// Single-channel form of the transform. Halfway values round away from zero.
#[inline]
pub fn xray_channel(value: u8, contrast: f32) -> u8 {
    let inverted = 255.0 - value as f32;
    let stretched = (inverted - 128.0) * contrast + 128.0;
    stretched.round().clamp(0.0, 255.0) as u8
}

fn apply_in_place(rgba: &mut [u8], contrast: f32) {
    let lut: [u8; 256] = std::array::from_fn(|v| xray_channel(v as u8, contrast));

    for pixel in rgba.chunks_exact_mut(buffer::CHANNELS) {
        pixel[0] = lut[pixel[0] as usize];
        pixel[1] = lut[pixel[1] as usize];
        pixel[2] = lut[pixel[2] as usize];
    }
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct XrayConfig {
    #[derivative(Default(value = "XRAY_CONTRAST"))]
    contrast: f32,
}

impl XrayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }
}

impl Effect for XrayConfig {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        if !self.contrast.is_finite() || self.contrast < 0.0 {
            return Err(ScanEffectError::InvalidParameter(format!(
                "xray contrast must be a non-negative number, got {}",
                self.contrast
            )));
        }

        let (width, height) = (image.width(), image.height());
        let mut pixels = PixelBuffer::try_from(image)?.into_raw();
        apply_in_place(&mut pixels, self.contrast);

        PixelBuffer::new(width, height, pixels)?.into_rgba_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(v: u8) -> u8 {
        ((255.0 - v as f32 - 128.0) * 1.5 + 128.0)
            .round()
            .clamp(0.0, 255.0) as u8
    }

    #[test]
    fn test_boundary_values() {
        let out = xray_transform(3, 1, &[0, 0, 0, 255, 128, 128, 128, 255, 255, 255, 255, 255])
            .unwrap();
        let raw = out.as_raw();

        // 318.5 clamps to 255
        assert_eq!(&raw[0..3], &[255, 255, 255]);
        // 126.5 rounds to 127
        assert_eq!(&raw[4..7], &[127, 127, 127]);
        // -64 clamps to 0
        assert_eq!(&raw[8..11], &[0, 0, 0]);
    }

    #[test]
    fn test_every_channel_value() {
        for v in 0..=255u8 {
            assert_eq!(xray_channel(v, XRAY_CONTRAST), expected(v), "value {v}");
        }
    }

    #[test]
    fn test_halfway_rounds_up() {
        // (131 - 128) * 1.5 + 128 = 132.5
        assert_eq!(xray_channel(124, XRAY_CONTRAST), 133);
        // (129 - 128) * 1.5 + 128 = 129.5
        assert_eq!(xray_channel(126, XRAY_CONTRAST), 130);
    }

    #[test]
    fn test_alpha_preserved() {
        let input: Vec<u8> = (0..=255u8)
            .flat_map(|a| [a, 255 - a, a / 2, a])
            .collect();
        let out = xray_transform(16, 16, &input).unwrap();

        for (src, dst) in input.chunks(4).zip(out.as_raw().chunks(4)) {
            assert_eq!(src[3], dst[3]);
        }
    }

    #[test]
    fn test_channels_independent() {
        let out = xray_transform(1, 1, &[0, 128, 255, 7]).unwrap();
        assert_eq!(out.as_raw(), &[255, 127, 0, 7]);
    }

    #[test]
    fn test_dimensions_preserved() {
        let input = vec![90u8; 7 * 5 * 4];
        let out = xray_transform(7, 5, &input).unwrap();
        assert_eq!((out.width(), out.height()), (7, 5));
        assert_eq!(out.as_raw().len(), input.len());
    }

    #[test]
    fn test_source_untouched() {
        let input = vec![10u8, 20, 30, 40];
        let copy = input.clone();
        let _ = xray_transform(1, 1, &input).unwrap();
        assert_eq!(input, copy);
    }

    #[test]
    fn test_empty_buffer_is_invalid_input() {
        let err = xray_transform(0, 0, &[]).unwrap_err();
        assert!(matches!(err, ScanEffectError::InvalidInput(_)));
    }

    #[test]
    fn test_malformed_buffer_is_invalid_input() {
        let err = xray_transform(1, 1, &[1, 2, 3, 4, 5]).unwrap_err();
        assert!(matches!(err, ScanEffectError::InvalidInput(_)));
    }

    #[test]
    fn test_not_idempotent() {
        let input: Vec<u8> = [10u8, 60, 100, 200].iter().flat_map(|&v| [v, v, v, 255]).collect();
        let once = xray_transform(4, 1, &input).unwrap();
        let twice = xray_transform(4, 1, once.as_raw()).unwrap();

        assert_ne!(twice.as_raw(), input.as_slice());
        // 10 -> 255 -> 0, not 10
        assert_eq!(twice.as_raw()[0], 0);
    }

    #[test]
    fn test_effect_matches_free_function() {
        let image = RgbaImage::from_fn(4, 3, |x, y| {
            image::Rgba([(x * 60) as u8, (y * 80) as u8, 200, (x + y) as u8])
        });
        let via_fn = xray_transform(4, 3, image.as_raw()).unwrap();
        let via_effect = XrayConfig::new().apply(image).unwrap();
        assert_eq!(via_effect.as_raw().as_slice(), via_fn.as_raw());
    }

    #[test]
    fn test_negative_contrast_rejected() {
        let image = RgbaImage::new(1, 1);
        let err = XrayConfig::new().with_contrast(-1.0).apply(image).unwrap_err();
        assert!(matches!(err, ScanEffectError::InvalidParameter(_)));
    }
}
