//! Decoding, PNG encoding, data urls and upload checks.

use crate::{ScanEffectError, ScanEffectResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use derivative::Derivative;
use derive_setters::Setters;
use image::{ImageFormat, ImageReader, RgbaImage};
use std::{io::Cursor, path::Path};

pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct UploadLimits {
    #[derivative(Default(value = "16 * 1024 * 1024"))]
    pub max_file_size: usize,

    #[derivative(Default(value = "4096"))]
    pub max_dimension: u32,

    #[derivative(Default(
        value = "[\"png\", \"jpg\", \"jpeg\", \"gif\", \"bmp\", \"tiff\"].map(String::from).to_vec()"
    ))]
    pub allowed_extensions: Vec<String>,
}

impl UploadLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        extension(name).is_some_and(|ext| self.allowed_extensions.iter().any(|a| *a == ext))
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check extension, byte size and pixel dimensions, in that order.
/// Only the image header is read for the dimension check.
pub fn validate_upload(name: &str, bytes: &[u8], limits: &UploadLimits) -> ScanEffectResult<()> {
    if !limits.is_allowed(name) {
        return Err(ScanEffectError::UnsupportedFormat(format!(
            "`{name}` is not one of {}",
            limits.allowed_extensions.join(", ")
        )));
    }

    if bytes.is_empty() {
        return Err(ScanEffectError::InvalidInput(format!("`{name}` is empty")));
    }

    if bytes.len() > limits.max_file_size {
        return Err(ScanEffectError::FileTooLarge {
            size: bytes.len(),
            max: limits.max_file_size,
        });
    }

    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;

    if width > limits.max_dimension || height > limits.max_dimension {
        return Err(ScanEffectError::DimensionsTooLarge {
            width,
            height,
            max: limits.max_dimension,
        });
    }

    Ok(())
}

pub fn decode_image(bytes: &[u8]) -> ScanEffectResult<RgbaImage> {
    if bytes.is_empty() {
        return Err(ScanEffectError::InvalidInput("empty image data".to_string()));
    }

    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

pub fn encode_png(image: &RgbaImage) -> ScanEffectResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Mime type for raw image bytes, falling back to `application/octet-stream`.
pub fn guess_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Split a base64 data url into its mime type and decoded bytes.
pub fn from_data_url(url: &str) -> ScanEffectResult<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ScanEffectError::InvalidDataUrl("missing `data:` prefix".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ScanEffectError::InvalidDataUrl("missing `,` separator".to_string()))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ScanEffectError::InvalidDataUrl("only base64 payloads are supported".to_string()))?;

    Ok((mime.to_string(), STANDARD.decode(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]))).unwrap()
    }

    #[test]
    fn test_png_roundtrip() {
        let image = RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8, y as u8, 9, 200]));
        let decoded = decode_image(&encode_png(&image).unwrap()).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_data_url_roundtrip() {
        let bytes = png_bytes(2, 2);
        let url = to_data_url(guess_mime(&bytes), &bytes);
        assert!(url.starts_with("data:image/png;base64,"));

        let (mime, decoded) = from_data_url(&url).unwrap();
        assert_eq!(mime, PNG_MIME);
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_bad_data_urls() {
        for url in ["image/png;base64,AAAA", "data:image/png;base64", "data:image/png,AAAA"] {
            let err = from_data_url(url).unwrap_err();
            assert!(matches!(err, ScanEffectError::InvalidDataUrl(_)), "{url}");
        }

        let err = from_data_url("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, ScanEffectError::Base64(_)));
    }

    #[test]
    fn test_upload_extension() {
        let limits = UploadLimits::new();
        assert!(limits.is_allowed("chest.PNG"));
        assert!(limits.is_allowed("scan.tiff"));
        assert!(!limits.is_allowed("notes.txt"));
        assert!(!limits.is_allowed("noextension"));

        let err = validate_upload("scan.dcm", &png_bytes(2, 2), &limits).unwrap_err();
        assert!(matches!(err, ScanEffectError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_upload_size_limit() {
        let bytes = png_bytes(8, 8);
        let limits = UploadLimits::new().with_max_file_size(bytes.len() - 1);
        let err = validate_upload("a.png", &bytes, &limits).unwrap_err();
        assert!(matches!(err, ScanEffectError::FileTooLarge { .. }));
    }

    #[test]
    fn test_upload_dimension_limit() {
        let limits = UploadLimits::new().with_max_dimension(16);
        assert!(validate_upload("a.png", &png_bytes(16, 16), &limits).is_ok());

        let err = validate_upload("a.png", &png_bytes(17, 4), &limits).unwrap_err();
        assert!(matches!(
            err,
            ScanEffectError::DimensionsTooLarge {
                width: 17,
                height: 4,
                max: 16
            }
        ));
    }

    #[test]
    fn test_garbage_upload() {
        let err = validate_upload("a.png", b"not an image", &UploadLimits::new()).unwrap_err();
        assert!(matches!(err, ScanEffectError::Image(_)));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(
            decode_image(&[]).unwrap_err(),
            ScanEffectError::InvalidInput(_)
        ));
    }
}
