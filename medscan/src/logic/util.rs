use crate::config::Config;
use anyhow::{Context, Result};
use image::RgbaImage;
use scan_effect::codec::{self, UploadLimits};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read {} failed", path.display()))
}

/// Read, check against the upload limits and decode.
pub fn load_image(path: &Path, limits: &UploadLimits) -> Result<RgbaImage> {
    let bytes = read_file(path)?;
    codec::validate_upload(&file_name(path), &bytes, limits)
        .with_context(|| format!("{} rejected", path.display()))?;

    Ok(codec::decode_image(&bytes)
        .with_context(|| format!("decode {} failed", path.display()))?)
}

pub fn write_png(path: &Path, png: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create dir {} failed", dir.display()))?;
        }
    }

    fs::write(path, png).with_context(|| format!("write {} failed", path.display()))
}

pub fn save_image(path: &Path, image: &RgbaImage) -> Result<()> {
    write_png(path, &codec::encode_png(image)?)
}

/// `<dir>/<stem><suffix>.png`, where `dir` is the configured output dir or
/// the input's own directory.
pub fn output_path(input: &Path, conf: &Config, suffix: &str) -> PathBuf {
    let dir = if conf.processing.output_dir.is_empty() {
        input.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        PathBuf::from(&conf.processing.output_dir)
    };

    output_in_dir(input, &dir, suffix)
}

pub fn output_in_dir(input: &Path, dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    dir.join(format!("{stem}{suffix}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    #[test]
    fn test_output_path_next_to_input() {
        let conf = Config::default();
        let out = output_path(Path::new("/scans/chest.jpg"), &conf, "_processed");
        assert_eq!(out, PathBuf::from("/scans/chest_processed.png"));
    }

    #[test]
    fn test_output_path_configured_dir() {
        let mut conf = Config::default();
        conf.processing.output_dir = "/out".to_string();
        let out = output_path(Path::new("/scans/chest.jpg"), &conf, "_lung");
        assert_eq!(out, PathBuf::from("/out/chest_lung.png"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("a.png");
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));

        save_image(&path, &image).unwrap();
        let loaded = load_image(&path, &UploadLimits::new()).unwrap();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_load_rejects_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, codec::encode_png(&RgbaImage::new(2, 2)).unwrap()).unwrap();

        assert!(load_image(&path, &UploadLimits::new()).is_err());
    }
}
