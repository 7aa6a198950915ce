//! ArcFace face embedder via ONNX Runtime.
//!
//! Maps a cropped face to an L2-normalized identity embedding using the
//! w600k_r50 ArcFace model. The crop is resized to 112×112 RGB; no landmark
//! alignment is applied because the SSD detector does not produce landmarks.

use crate::types::Embedding;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const ARCFACE_INPUT_SIZE: usize = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // NOT 128.0 — ArcFace uses symmetric normalization
const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("face crop is {width}x{height}, smaller than the {min}px minimum")]
    CropTooSmall { width: u32, height: u32, min: u32 },
    #[error("embedding has {actual} dimensions, expected {expected}")]
    WrongDimension { expected: usize, actual: usize },
    #[error("embedding contains non-finite values")]
    NonFinite,
    #[error("embedding has zero norm")]
    ZeroNorm,
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Maps a cropped face image to an identity embedding.
///
/// Identical crops must produce identical embeddings. Implementations must be
/// safe to call from several requests at once.
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, face_crop: &RgbImage) -> Result<Embedding, EmbeddingError>;
}

/// ArcFace-based face embedder.
pub struct ArcFaceEmbedder {
    session: Mutex<Session>,
    embedding_dim: usize,
    min_crop_size: u32,
}

impl ArcFaceEmbedder {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(
        model_path: &str,
        embedding_dim: usize,
        min_crop_size: u32,
        intra_threads: usize,
    ) -> Result<Self, EmbeddingError> {
        if !Path::new(model_path).exists() {
            return Err(EmbeddingError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            embedding_dim,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self {
            session: Mutex::new(session),
            embedding_dim,
            min_crop_size,
        })
    }

    /// Resize the crop to 112×112 and build a normalized RGB NCHW tensor.
    fn preprocess(face_crop: &RgbImage) -> Array4<f32> {
        let size = ARCFACE_INPUT_SIZE;
        let resized =
            image::imageops::resize(face_crop, size as u32, size as u32, FilterType::Triangle);
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for (c, &value) in pixel.0.iter().enumerate() {
                tensor[[0, c, y, x]] = (value as f32 - ARCFACE_MEAN) / ARCFACE_STD;
            }
        }

        tensor
    }
}

impl FaceEmbedder for ArcFaceEmbedder {
    fn embed(&self, face_crop: &RgbImage) -> Result<Embedding, EmbeddingError> {
        check_crop_size(face_crop, self.min_crop_size)?;

        let input = Self::preprocess(face_crop);

        let raw: Vec<f32> = {
            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
            let (_, raw_data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EmbeddingError::InferenceFailed(format!("embedding extraction: {e}")))?;
            raw_data.to_vec()
        };

        let values = normalize_embedding(raw, self.embedding_dim)?;

        Ok(Embedding {
            values,
            model_version: Some(ARCFACE_MODEL_VERSION.to_string()),
        })
    }
}

/// Reject crops too small to carry identity information.
pub fn check_crop_size(face_crop: &RgbImage, min: u32) -> Result<(), EmbeddingError> {
    let (width, height) = face_crop.dimensions();
    if width < min || height < min {
        return Err(EmbeddingError::CropTooSmall { width, height, min });
    }
    Ok(())
}

/// Validate a raw model output and L2-normalize it.
pub fn normalize_embedding(raw: Vec<f32>, expected_dim: usize) -> Result<Vec<f32>, EmbeddingError> {
    if raw.len() != expected_dim {
        return Err(EmbeddingError::WrongDimension {
            expected: expected_dim,
            actual: raw.len(),
        });
    }
    if raw.iter().any(|x| !x.is_finite()) {
        return Err(EmbeddingError::NonFinite);
    }

    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() {
        return Err(EmbeddingError::NonFinite);
    }
    if norm == 0.0 {
        return Err(EmbeddingError::ZeroNorm);
    }

    Ok(raw.iter().map(|x| x / norm).collect())
}
