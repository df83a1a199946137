//! Model-input preparation and region-of-interest cropping for chest films.

use crate::{ScanEffectError, ScanEffectResult, enhance::luma_image, ensure_not_empty};
use derivative::Derivative;
use derive_setters::Setters;
use image::{GrayImage, Luma, Rgba, RgbaImage, imageops::FilterType};
use imageproc::{
    contours::{BorderType, Contour},
    drawing::{draw_filled_rect_mut, draw_polygon_mut},
    point::Point,
    rect::Rect,
};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct PreprocessConfig {
    #[derivative(Default(value = "224"))]
    pub target_width: u32,

    #[derivative(Default(value = "224"))]
    pub target_height: u32,

    /// Letterbox instead of stretching.
    pub keep_aspect: bool,

    #[derivative(Default(value = "IMAGENET_MEAN"))]
    pub mean: [f32; 3],

    #[derivative(Default(value = "IMAGENET_STD"))]
    pub std: [f32; 3],
}

impl PreprocessConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Normalized RGB float tensor in HWC order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ModelInput {
    pub fn at(&self, x: u32, y: u32, channel: usize) -> f32 {
        self.data[(y as usize * self.width as usize + x as usize) * 3 + channel]
    }

    /// Per-channel (mean, std) of the tensor.
    pub fn channel_stats(&self) -> [(f32, f32); 3] {
        let count = (self.data.len() / 3).max(1) as f32;
        std::array::from_fn(|c| {
            let values = self.data.iter().skip(c).step_by(3);
            let mean = values.clone().sum::<f32>() / count;
            let variance = values.map(|v| (v - mean) * (v - mean)).sum::<f32>() / count;
            (mean, variance.sqrt())
        })
    }
}

/// Scale into `target_width x target_height` keeping the aspect ratio, then
/// center on an opaque black canvas.
pub fn resize_with_aspect_ratio(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> ScanEffectResult<RgbaImage> {
    ensure_not_empty(image)?;
    if target_width == 0 || target_height == 0 {
        return Err(ScanEffectError::InvalidParameter(format!(
            "target size must be non-zero, got {target_width}x{target_height}"
        )));
    }

    let (width, height) = image.dimensions();
    let scale = (target_width as f64 / width as f64).min(target_height as f64 / height as f64);
    let new_width = ((width as f64 * scale) as u32).clamp(1, target_width);
    let new_height = ((height as f64 * scale) as u32).clamp(1, target_height);

    let resized = image::imageops::resize(image, new_width, new_height, FilterType::Triangle);
    let mut canvas = RgbaImage::from_pixel(target_width, target_height, Rgba([0, 0, 0, 255]));
    let x_offset = (target_width - new_width) / 2;
    let y_offset = (target_height - new_height) / 2;
    image::imageops::replace(&mut canvas, &resized, x_offset as i64, y_offset as i64);

    Ok(canvas)
}

pub fn prepare_model_input(
    image: &RgbaImage,
    config: &PreprocessConfig,
) -> ScanEffectResult<ModelInput> {
    ensure_not_empty(image)?;
    if config.std.iter().any(|s| *s <= 0.0) {
        return Err(ScanEffectError::InvalidParameter(format!(
            "normalization std must be positive, got {:?}",
            config.std
        )));
    }

    let resized = if config.keep_aspect {
        resize_with_aspect_ratio(image, config.target_width, config.target_height)?
    } else {
        if config.target_width == 0 || config.target_height == 0 {
            return Err(ScanEffectError::InvalidParameter(
                "target size must be non-zero".to_string(),
            ));
        }

        image::imageops::resize(
            image,
            config.target_width,
            config.target_height,
            FilterType::Triangle,
        )
    };

    let mut data = Vec::with_capacity(resized.width() as usize * resized.height() as usize * 3);
    for pixel in resized.pixels() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            data.push((v - config.mean[c]) / config.std[c]);
        }
    }

    Ok(ModelInput {
        width: resized.width(),
        height: resized.height(),
        data,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct LungRegion {
    /// 255 inside the largest contour, 0 elsewhere. All 255 when nothing was found.
    pub mask: GrayImage,
    pub bounds: Option<RegionBounds>,
}

/// Blur, Otsu-threshold, and keep the largest outer contour.
pub fn detect_lung_region(image: &RgbaImage) -> ScanEffectResult<LungRegion> {
    ensure_not_empty(image)?;

    let gray = luma_image(image);
    let blurred = imageproc::filter::gaussian_blur_f32(&gray, 1.1);
    let level = imageproc::contrast::otsu_level(&blurred);
    let binary = GrayImage::from_fn(blurred.width(), blurred.height(), |x, y| {
        Luma([if blurred.get_pixel(x, y)[0] > level { 255 } else { 0 }])
    });

    let contours = imageproc::contours::find_contours::<i32>(&binary);
    let largest = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .max_by_key(|c| contour_area2(c));

    let Some((contour, bounds)) = largest.and_then(|c| Some((c, contour_bounds(c)?))) else {
        log::debug!("no lung region found at otsu level {level}");
        return Ok(LungRegion {
            mask: GrayImage::from_pixel(image.width(), image.height(), Luma([255])),
            bounds: None,
        });
    };

    let mut mask = GrayImage::new(image.width(), image.height());
    let polygon = polygon_points(contour);
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, &polygon, Luma([255]));
    } else {
        draw_filled_rect_mut(
            &mut mask,
            Rect::at(bounds.x as i32, bounds.y as i32).of_size(bounds.width, bounds.height),
            Luma([255]),
        );
    }

    log::debug!("lung region {bounds:?} at otsu level {level}");
    Ok(LungRegion {
        mask,
        bounds: Some(bounds),
    })
}

/// Crop to the detected region grown by `padding` of its size on each side.
/// Returns the input unchanged when no region is found.
pub fn crop_to_lung_region(image: &RgbaImage, padding: f32) -> ScanEffectResult<RgbaImage> {
    if !(0.0..=1.0).contains(&padding) {
        return Err(ScanEffectError::InvalidParameter(format!(
            "padding must be within 0.0 - 1.0, got {padding}"
        )));
    }

    let region = detect_lung_region(image)?;
    let Some(bounds) = region.bounds else {
        return Ok(image.clone());
    };

    let pad_x = (bounds.width as f32 * padding) as u32;
    let pad_y = (bounds.height as f32 * padding) as u32;
    let x = bounds.x.saturating_sub(pad_x);
    let y = bounds.y.saturating_sub(pad_y);
    let width = (bounds.width + 2 * pad_x).min(image.width() - x);
    let height = (bounds.height + 2 * pad_y).min(image.height() - y);

    Ok(image::imageops::crop_imm(image, x, y, width, height).to_image())
}

// Consecutive duplicates removed; the polygon must not repeat its first point at the end.
fn polygon_points(contour: &Contour<i32>) -> Vec<Point<i32>> {
    let mut points = contour.points.clone();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    points
}

// Twice the shoelace area, kept integral for ordering.
fn contour_area2(contour: &Contour<i32>) -> i64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0;
    }

    let mut sum = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        sum += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }

    sum.abs()
}

fn contour_bounds(contour: &Contour<i32>) -> Option<RegionBounds> {
    let min_x = contour.points.iter().map(|p| p.x).min()?;
    let max_x = contour.points.iter().map(|p| p.x).max()?;
    let min_y = contour.points.iter().map(|p| p.y).min()?;
    let max_y = contour.points.iter().map(|p| p.y).max()?;

    Some(RegionBounds {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film_with_region() -> RgbaImage {
        RgbaImage::from_fn(100, 100, |x, y| {
            if (30..70).contains(&x) && (20..80).contains(&y) {
                Rgba([230, 230, 230, 255])
            } else {
                Rgba([15, 15, 15, 255])
            }
        })
    }

    #[test]
    fn test_letterbox_size_and_bars() {
        let image = RgbaImage::from_pixel(200, 100, Rgba([200, 10, 10, 255]));
        let out = resize_with_aspect_ratio(&image, 224, 224).unwrap();
        assert_eq!(out.dimensions(), (224, 224));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(112, 223), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(112, 112), &Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn test_letterbox_rejects_zero_target() {
        let image = RgbaImage::new(4, 4);
        assert!(resize_with_aspect_ratio(&image, 0, 10).is_err());
    }

    #[test]
    fn test_model_input_normalization() {
        let image = RgbaImage::from_pixel(10, 20, Rgba([255, 0, 128, 255]));
        let input = prepare_model_input(&image, &PreprocessConfig::new()).unwrap();
        assert_eq!((input.width, input.height), (224, 224));
        assert_eq!(input.data.len(), 224 * 224 * 3);

        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        assert!((input.at(100, 100, 0) - red).abs() < 1e-4);
        assert!((input.at(100, 100, 1) - green).abs() < 1e-4);
    }

    #[test]
    fn test_model_input_identity_normalization() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([51, 102, 204, 255]));
        let config = PreprocessConfig::new()
            .with_target_width(2)
            .with_target_height(2)
            .with_mean([0.0; 3])
            .with_std([1.0; 3]);
        let input = prepare_model_input(&image, &config).unwrap();
        let stats = input.channel_stats();
        assert!((stats[0].0 - 0.2).abs() < 1e-4);
        assert!((stats[2].0 - 0.8).abs() < 1e-4);
        assert!(stats[1].1 < 1e-4);
    }

    #[test]
    fn test_model_input_rejects_bad_std() {
        let image = RgbaImage::new(4, 4);
        let config = PreprocessConfig::new().with_std([0.0, 1.0, 1.0]);
        assert!(prepare_model_input(&image, &config).is_err());
    }

    #[test]
    fn test_detects_bright_region() {
        let region = detect_lung_region(&film_with_region()).unwrap();
        let bounds = region.bounds.unwrap();
        assert!(bounds.x.abs_diff(30) <= 2, "{bounds:?}");
        assert!(bounds.y.abs_diff(20) <= 2, "{bounds:?}");
        assert!(bounds.width.abs_diff(40) <= 4, "{bounds:?}");
        assert!(bounds.height.abs_diff(60) <= 4, "{bounds:?}");
        assert_eq!(region.mask.get_pixel(50, 50)[0], 255);
        assert_eq!(region.mask.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn test_mask_follows_contour() {
        let image = RgbaImage::from_fn(100, 100, |x, y| {
            if x.abs_diff(50) + y.abs_diff(50) <= 30 {
                Rgba([230, 230, 230, 255])
            } else {
                Rgba([15, 15, 15, 255])
            }
        });

        let region = detect_lung_region(&image).unwrap();
        let bounds = region.bounds.unwrap();
        assert!(bounds.x.abs_diff(20) <= 2, "{bounds:?}");
        assert!(bounds.width.abs_diff(61) <= 4, "{bounds:?}");

        assert_eq!(region.mask.get_pixel(50, 50)[0], 255);
        assert_eq!(region.mask.get_pixel(50, 25)[0], 255);
        // inside the bounding box, outside the diamond
        assert_eq!(region.mask.get_pixel(24, 24)[0], 0);
        assert_eq!(region.mask.get_pixel(76, 76)[0], 0);
    }

    #[test]
    fn test_no_region_in_black_image() {
        let image = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        let region = detect_lung_region(&image).unwrap();
        assert!(region.bounds.is_none());
        assert!(region.mask.pixels().all(|p| p[0] == 255));

        let cropped = crop_to_lung_region(&image, 0.1).unwrap();
        assert_eq!(cropped.dimensions(), (40, 40));
    }

    #[test]
    fn test_crop_adds_padding() {
        let cropped = crop_to_lung_region(&film_with_region(), 0.1).unwrap();
        let (w, h) = cropped.dimensions();
        assert!(w.abs_diff(48) <= 5, "width {w}");
        assert!(h.abs_diff(72) <= 5, "height {h}");
    }

    #[test]
    fn test_crop_rejects_bad_padding() {
        assert!(crop_to_lung_region(&film_with_region(), 1.5).is_err());
    }
}
