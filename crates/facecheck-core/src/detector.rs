//! Single-shot face detector (ResNet-10 SSD) via ONNX Runtime.
//!
//! Runs the 300×300 SSD face model and keeps the single most confident
//! face. Faces that do not clear the threshold, or whose box collapses after
//! clamping to the image, are reported as "no face" rather than as errors.

use crate::types::FaceRegion;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use std::path::Path;
use thiserror::Error;

// --- Named constants (no magic numbers) ---
const SSD_INPUT_SIZE: usize = 300;
/// Per-channel mean in BGR order, subtracted before inference.
const SSD_MEAN_BGR: [f32; 3] = [104.0, 177.0, 123.0];
/// Each detection row: [image_id, label, confidence, x1, y1, x2, y2].
const SSD_ROW_LEN: usize = 7;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Locates the most prominent face in an image.
///
/// `Ok(None)` means no face cleared the threshold. Implementations must be
/// safe to call from several requests at once.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceRegion>, DetectorError>;
}

/// SSD-based face detector.
pub struct SsdFaceDetector {
    session: Mutex<Session>,
    threshold: f32,
    min_face_size: f32,
}

impl SsdFaceDetector {
    /// Load the SSD ONNX model from the given path.
    pub fn load(
        model_path: &str,
        threshold: f32,
        min_face_size: f32,
        intra_threads: usize,
    ) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            threshold,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded SSD face detector"
        );

        Ok(Self {
            session: Mutex::new(session),
            threshold,
            min_face_size,
        })
    }

    /// Resize to 300×300 and build a BGR, mean-subtracted NCHW tensor.
    fn preprocess(image: &RgbImage) -> Array4<f32> {
        let size = SSD_INPUT_SIZE;
        let resized = image::imageops::resize(image, size as u32, size as u32, FilterType::Triangle);
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in resized.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = b as f32 - SSD_MEAN_BGR[0];
            tensor[[0, 1, y, x]] = g as f32 - SSD_MEAN_BGR[1];
            tensor[[0, 2, y, x]] = r as f32 - SSD_MEAN_BGR[2];
        }

        tensor
    }
}

impl FaceDetector for SsdFaceDetector {
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceRegion>, DetectorError> {
        let input = Self::preprocess(image);

        let rows: Vec<f32> = {
            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
            let (_, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("detections: {e}")))?;
            data.to_vec()
        };

        if rows.len() % SSD_ROW_LEN != 0 {
            return Err(DetectorError::InferenceFailed(format!(
                "detection tensor length {} is not a multiple of {SSD_ROW_LEN}",
                rows.len()
            )));
        }

        let (width, height) = image.dimensions();
        Ok(select_face(&rows, width, height, self.threshold, self.min_face_size))
    }
}

/// Pick the most confident detection and map it into image pixels.
///
/// Returns `None` when no row clears `threshold`, or when the winning box is
/// narrower or shorter than `min_face_size` once clamped to the image.
fn select_face(
    rows: &[f32],
    width: u32,
    height: u32,
    threshold: f32,
    min_face_size: f32,
) -> Option<FaceRegion> {
    let best = rows
        .chunks_exact(SSD_ROW_LEN)
        .filter(|row| row[2].is_finite() && row[2] >= threshold)
        .max_by(|a, b| a[2].partial_cmp(&b[2]).unwrap_or(std::cmp::Ordering::Equal))?;

    let (w, h) = (width as f32, height as f32);
    let x1 = (best[3] * w).clamp(0.0, w);
    let y1 = (best[4] * h).clamp(0.0, h);
    let x2 = (best[5] * w).clamp(0.0, w);
    let y2 = (best[6] * h).clamp(0.0, h);

    let region = FaceRegion {
        x: x1,
        y: y1,
        width: x2 - x1,
        height: y2 - y1,
        confidence: best[2].min(1.0),
    };

    // NaN coordinates fail both comparisons and land here too.
    if !(region.width >= min_face_size && region.height >= min_face_size) {
        tracing::debug!(?region, min_face_size, "best face candidate is degenerate");
        return None;
    }

    Some(region)
}
