//! Upload-and-process state for a single image.
//!
//! Holds the current upload and at most one processed result. A new upload
//! discards the previous result; `reset` discards both.

use crate::{
    Effect, PixelBuffer, ScanEffectError, ScanEffectResult, ScanPreset,
    codec::{self, UploadLimits},
};
use image::RgbaImage;

#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub data_url: String,
    pub image: RgbaImage,
}

#[derive(Debug, Clone)]
pub struct Processed {
    pub data_url: String,
    pub image: RgbaImage,
    pub png: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Workbench {
    limits: UploadLimits,
    upload: Option<Upload>,
    processed: Option<Processed>,
}

impl Workbench {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            upload: None,
            processed: None,
        }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn upload(&mut self, name: &str, bytes: &[u8]) -> ScanEffectResult<&Upload> {
        codec::validate_upload(name, bytes, &self.limits)?;
        let image = codec::decode_image(bytes)?;
        log::debug!("uploaded {name}: {}x{}", image.width(), image.height());

        self.processed = None;
        Ok(self.upload.insert(Upload {
            name: name.to_string(),
            data_url: codec::to_data_url(codec::guess_mime(bytes), bytes),
            image,
        }))
    }

    /// Upload an already-decoded buffer, skipping file checks.
    pub fn upload_buffer(&mut self, name: &str, buffer: PixelBuffer) -> ScanEffectResult<&Upload> {
        let image = buffer.into_rgba_image()?;
        let png = codec::encode_png(&image)?;

        self.processed = None;
        Ok(self.upload.insert(Upload {
            name: name.to_string(),
            data_url: codec::to_data_url(codec::PNG_MIME, &png),
            image,
        }))
    }

    pub fn apply(&mut self, effect: &dyn Effect) -> ScanEffectResult<&Processed> {
        let upload = self.upload.as_ref().ok_or(ScanEffectError::NoImage)?;
        let image = effect.apply(upload.image.clone())?;
        let png = codec::encode_png(&image)?;

        Ok(self.processed.insert(Processed {
            data_url: codec::to_data_url(codec::PNG_MIME, &png),
            image,
            png,
        }))
    }

    /// `ScanPreset::None` copies the upload through unchanged.
    pub fn apply_preset(&mut self, preset: ScanPreset) -> ScanEffectResult<&Processed> {
        match preset.effect() {
            Some(effect) => self.apply(&effect),
            None => self.apply(&Passthrough),
        }
    }

    pub fn original(&self) -> Option<&Upload> {
        self.upload.as_ref()
    }

    pub fn processed(&self) -> Option<&Processed> {
        self.processed.as_ref()
    }

    pub fn reset(&mut self) {
        self.upload = None;
        self.processed = None;
    }
}

struct Passthrough;

impl Effect for Passthrough {
    fn apply(&self, image: RgbaImage) -> ScanEffectResult<RgbaImage> {
        Ok(image)
    }
}
