use crate::{ScanEffectError, ScanEffectResult};
use image::RgbaImage;

pub const CHANNELS: usize = 4;

/// A flat RGBA8 buffer in row-major order.
///
/// Construction checks that the byte length is non-zero, a multiple of four,
/// and matches `width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> ScanEffectResult<Self> {
        validate_rgba(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    pub fn to_rgba_image(&self) -> ScanEffectResult<RgbaImage> {
        self.clone().into_rgba_image()
    }

    pub fn into_rgba_image(self) -> ScanEffectResult<RgbaImage> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.data).ok_or_else(|| {
            ScanEffectError::InvalidInput(format!("buffer does not fit {width}x{height}"))
        })
    }
}

impl TryFrom<RgbaImage> for PixelBuffer {
    type Error = ScanEffectError;

    fn try_from(image: RgbaImage) -> ScanEffectResult<Self> {
        let (width, height) = (image.width(), image.height());
        Self::new(width, height, image.into_raw())
    }
}

pub fn validate_rgba(width: u32, height: u32, data: &[u8]) -> ScanEffectResult<()> {
    if data.is_empty() {
        return Err(ScanEffectError::InvalidInput("empty pixel buffer".to_string()));
    }

    if data.len() % CHANNELS != 0 {
        return Err(ScanEffectError::InvalidInput(format!(
            "buffer length {} is not a multiple of {CHANNELS}",
            data.len()
        )));
    }

    let expected = width as usize * height as usize * CHANNELS;
    if expected != data.len() {
        return Err(ScanEffectError::InvalidInput(format!(
            "buffer length {} does not match {width}x{height} RGBA ({expected} bytes)",
            data.len()
        )));
    }

    Ok(())
}
