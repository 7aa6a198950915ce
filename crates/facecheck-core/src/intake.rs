//! Image intake: upload bytes → RGB raster, and face cropping.

use crate::types::FaceRegion;
use image::{ImageFormat, RgbImage};
use std::path::Path;
use thiserror::Error;

/// Upload size cap enforced on raw image bytes (4 MiB).
pub const MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,
    #[error("image is {0} bytes, larger than the {max} byte limit", max = MAX_UPLOAD_BYTES)]
    TooLarge(usize),
    #[error("unsupported image format (expected PNG or JPEG)")]
    UnsupportedFormat,
    #[error("image dimensions are zero")]
    ZeroDimensions,
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Decode uploaded bytes into an 8-bit RGB raster.
///
/// Only PNG and JPEG are accepted; PDFs must be rasterized before they get here.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge(bytes.len()));
    }

    let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(ImageError::UnsupportedFormat);
    }

    let decoded = image::load_from_memory_with_format(bytes, format)?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ImageError::ZeroDimensions);
    }

    tracing::debug!(
        ?format,
        width = decoded.width(),
        height = decoded.height(),
        "decoded image"
    );

    Ok(decoded.to_rgb8())
}

/// Read and decode an image file.
pub fn decode_image_file(path: &Path) -> Result<RgbImage, ImageError> {
    let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
        path: path.display().to_string(),
        source,
    })?;
    decode_image(&bytes)
}

/// Crop a detected face out of `image`.
///
/// `margin` widens the box by that fraction of its size on every side; the
/// result is clamped to the image. The crop is at least 1×1.
pub fn crop_face(image: &RgbImage, region: &FaceRegion, margin: f32) -> RgbImage {
    let (img_w, img_h) = image.dimensions();

    let pad_x = region.width * margin;
    let pad_y = region.height * margin;

    let x1 = (region.x - pad_x).floor().clamp(0.0, img_w as f32) as u32;
    let y1 = (region.y - pad_y).floor().clamp(0.0, img_h as f32) as u32;
    let x2 = (region.x + region.width + pad_x).ceil().clamp(0.0, img_w as f32) as u32;
    let y2 = (region.y + region.height + pad_y).ceil().clamp(0.0, img_h as f32) as u32;

    let x1 = x1.min(img_w.saturating_sub(1));
    let y1 = y1.min(img_h.saturating_sub(1));
    let w = x2.saturating_sub(x1).max(1);
    let h = y2.saturating_sub(y1).max(1);

    image::imageops::crop_imm(image, x1, y1, w, h).to_image()
}
