//! Per-image quality diagnostics for a detected face.
//!
//! These scores are reported alongside the verdict and never influence it.

use crate::types::{FaceRegion, QualityReport};
use image::{GrayImage, RgbImage};

/// Compute blur, relative size and brightness for `region` within `image`.
pub fn assess_quality(image: &RgbImage, region: &FaceRegion) -> QualityReport {
    let (img_w, img_h) = image.dimensions();
    let image_area = img_w as f32 * img_h as f32;
    let face_size_ratio = if image_area > 0.0 {
        (region.area() / image_area).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let (x1, y1, x2, y2) = pixel_bounds(region, img_w, img_h);
    if x2 <= x1 || y2 <= y1 {
        return QualityReport {
            blur_score: 0.0,
            face_size_ratio,
            brightness: 0.0,
        };
    }

    let face = image::imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image();
    let gray = image::imageops::grayscale(&face);

    QualityReport {
        blur_score: laplacian_variance(&gray),
        face_size_ratio,
        brightness: mean_brightness(&gray),
    }
}

/// Integer pixel bounds of a region, clamped to the image.
fn pixel_bounds(region: &FaceRegion, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let x1 = region.x.max(0.0).floor().min(width as f32) as u32;
    let y1 = region.y.max(0.0).floor().min(height as f32) as u32;
    let x2 = (region.x + region.width).ceil().clamp(0.0, width as f32) as u32;
    let y2 = (region.y + region.height).ceil().clamp(0.0, height as f32) as u32;
    (x1, y1, x2, y2)
}

/// Variance of the 4-neighbour Laplacian over interior pixels.
///
/// Sharp edges give large responses; a defocused or flat face gives values
/// near zero. Images smaller than 3×3 score 0.
fn laplacian_variance(gray: &GrayImage) -> f32 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
            count += 1;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    ((sum_sq / n) - mean * mean).max(0.0) as f32
}

/// Mean luma (0–255).
fn mean_brightness(gray: &GrayImage) -> f32 {
    let pixels = gray.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    (pixels.iter().map(|&p| p as u64).sum::<u64>() as f64 / pixels.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn region(x: f32, y: f32, w: f32, h: f32) -> FaceRegion {
        FaceRegion { x, y, width: w, height: h, confidence: 0.9 }
    }

    #[test]
    fn test_flat_image_has_no_blur_response() {
        let img = RgbImage::from_pixel(100, 100, Rgb([90, 90, 90]));
        let q = assess_quality(&img, &region(10.0, 10.0, 50.0, 50.0));
        assert_eq!(q.blur_score, 0.0);
        assert!((q.brightness - 90.0).abs() < 1e-3);
        assert!((q.face_size_ratio - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_checkerboard_is_sharper_than_gradient() {
        let checker = RgbImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        });
        let gradient = RgbImage::from_fn(64, 64, |x, _| {
            let v = (x * 4) as u8;
            Rgb([v, v, v])
        });
        let r = region(0.0, 0.0, 64.0, 64.0);
        let sharp = assess_quality(&checker, &r).blur_score;
        let smooth = assess_quality(&gradient, &r).blur_score;
        assert!(sharp > smooth, "checker={sharp}, gradient={smooth}");
        assert!(smooth < 1.0);
    }

    #[test]
    fn test_brightness_only_counts_face_region() {
        let img = RgbImage::from_fn(100, 100, |x, _| {
            if x < 50 { Rgb([200, 200, 200]) } else { Rgb([20, 20, 20]) }
        });
        let q = assess_quality(&img, &region(0.0, 0.0, 50.0, 100.0));
        assert!((q.brightness - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_region() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let q = assess_quality(&img, &region(10.0, 10.0, 0.0, 0.0));
        assert_eq!(q.blur_score, 0.0);
        assert_eq!(q.brightness, 0.0);
        assert_eq!(q.face_size_ratio, 0.0);
    }

    #[test]
    fn test_laplacian_tiny_image() {
        let gray = GrayImage::from_pixel(2, 2, Luma([10]));
        assert_eq!(laplacian_variance(&gray), 0.0);
    }
}
