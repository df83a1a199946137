//! Image quality checks run before analysis.

use crate::{ScanEffectResult, enhance::luma_image, ensure_not_empty};
use derivative::Derivative;
use derive_setters::Setters;
use image::{GrayImage, RgbaImage};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityIssue {
    LowResolution,
    TooDark,
    TooBright,
    LowContrast,
    Blurred,
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QualityIssue::LowResolution => "Image resolution too low",
            QualityIssue::TooDark => "Image too dark",
            QualityIssue::TooBright => "Image too bright",
            QualityIssue::LowContrast => "Low contrast image",
            QualityIssue::Blurred => "Image appears blurred",
        };

        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct QualityThresholds {
    #[derivative(Default(value = "100"))]
    pub min_dimension: u32,

    #[derivative(Default(value = "30.0"))]
    pub min_mean: f64,

    #[derivative(Default(value = "225.0"))]
    pub max_mean: f64,

    #[derivative(Default(value = "20.0"))]
    pub min_std_dev: f64,

    /// Variance of the Laplacian below which the image counts as blurred.
    #[derivative(Default(value = "100.0"))]
    pub min_sharpness: f64,
}

impl QualityThresholds {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    pub is_valid: bool,
    pub issues: Vec<QualityIssue>,
    /// 0.0 - 1.0, average of normalized sharpness and contrast.
    pub quality_score: f64,
    pub mean_intensity: f64,
    pub contrast: f64,
    pub sharpness: f64,
}

pub fn assess(image: &RgbaImage, thresholds: &QualityThresholds) -> ScanEffectResult<QualityReport> {
    ensure_not_empty(image)?;

    let gray = luma_image(image);
    let (mean_intensity, contrast) = mean_and_std(&gray);
    let sharpness = laplacian_variance(&gray);

    let mut issues = vec![];
    if image.width() < thresholds.min_dimension || image.height() < thresholds.min_dimension {
        issues.push(QualityIssue::LowResolution);
    }

    if mean_intensity < thresholds.min_mean {
        issues.push(QualityIssue::TooDark);
    } else if mean_intensity > thresholds.max_mean {
        issues.push(QualityIssue::TooBright);
    }

    if contrast < thresholds.min_std_dev {
        issues.push(QualityIssue::LowContrast);
    }

    if sharpness < thresholds.min_sharpness {
        issues.push(QualityIssue::Blurred);
    }

    let quality_score = quality_score(sharpness, contrast);
    log::debug!(
        "quality: mean={mean_intensity:.1} std={contrast:.1} sharpness={sharpness:.1} score={quality_score:.2} issues={issues:?}"
    );

    Ok(QualityReport {
        is_valid: issues.is_empty(),
        issues,
        quality_score,
        mean_intensity,
        contrast,
        sharpness,
    })
}

pub fn quality_score(sharpness: f64, contrast: f64) -> f64 {
    let sharpness_score = (sharpness / 1000.0).min(1.0);
    let contrast_score = (contrast / 100.0).min(1.0);
    ((sharpness_score + contrast_score) / 2.0).clamp(0.0, 1.0)
}

pub fn mean_and_std(gray: &GrayImage) -> (f64, f64) {
    let count = (gray.width() as u64 * gray.height() as u64).max(1) as f64;
    let (sum, sum_sq) = gray.pixels().fold((0.0, 0.0), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });

    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let laplacian = imageproc::filter::laplacian_filter(gray);
    let count = (laplacian.width() as u64 * laplacian.height() as u64).max(1) as f64;
    let (sum, sum_sq) = laplacian.pixels().fold((0.0, 0.0), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checkerboard(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            let v = if (x + y) % 2 == 0 { 0 } else { 255 };
            Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn test_sharp_image_is_valid() {
        let report = assess(&checkerboard(128), &QualityThresholds::new()).unwrap();
        assert!(report.is_valid, "{:?}", report.issues);
        assert!(report.sharpness > 1000.0);
        assert!((report.quality_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dark_flat_image() {
        let image = RgbaImage::from_pixel(200, 200, Rgba([10, 10, 10, 255]));
        let report = assess(&image, &QualityThresholds::new()).unwrap();
        assert!(!report.is_valid);
        assert_eq!(
            report.issues,
            vec![
                QualityIssue::TooDark,
                QualityIssue::LowContrast,
                QualityIssue::Blurred
            ]
        );
        assert!(report.quality_score < 1e-6);
    }

    #[test]
    fn test_bright_image() {
        let image = RgbaImage::from_pixel(120, 120, Rgba([250, 250, 250, 255]));
        let report = assess(&image, &QualityThresholds::new()).unwrap();
        assert!(report.issues.contains(&QualityIssue::TooBright));
    }

    #[test]
    fn test_small_image() {
        let report = assess(&checkerboard(50), &QualityThresholds::new()).unwrap();
        assert_eq!(report.issues, vec![QualityIssue::LowResolution]);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = QualityThresholds::new().with_min_dimension(10);
        let report = assess(&checkerboard(50), &thresholds).unwrap();
        assert!(report.is_valid);
    }

    #[test]
    fn test_issue_text() {
        assert_eq!(QualityIssue::Blurred.to_string(), "Image appears blurred");
    }

    #[test]
    fn test_empty_image_rejected() {
        assert!(assess(&RgbaImage::new(0, 0), &QualityThresholds::new()).is_err());
    }
}
