//! Pipeline configuration: model locations and decision thresholds.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for the detect → embed → compare pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// File name of the SSD face detector inside `model_dir`.
    pub detector_model: String,
    /// File name of the ArcFace embedder inside `model_dir`.
    pub embedder_model: String,
    /// Minimum detection confidence for a face candidate.
    pub detection_threshold: f32,
    /// Minimum match confidence (rescaled cosine) for a positive match.
    pub match_threshold: f32,
    /// Boxes narrower or shorter than this (pixels, after clamping) count as no face.
    pub min_face_size: f32,
    /// Face crops with a side below this (pixels) are rejected by the embedder.
    pub min_crop_size: u32,
    /// Fraction of the box size added on each side before cropping.
    pub crop_margin: f32,
    /// Expected embedding dimensionality.
    pub embedding_dim: usize,
    /// ONNX Runtime intra-op threads per session.
    pub intra_threads: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            model_dir: crate::default_model_dir(),
            detector_model: "res10_300x300_ssd_iter_140000.onnx".to_string(),
            embedder_model: "w600k_r50.onnx".to_string(),
            detection_threshold: 0.5,
            match_threshold: 0.65,
            min_face_size: 2.0,
            min_crop_size: 16,
            crop_margin: 0.0,
            embedding_dim: 512,
            intra_threads: 2,
        }
    }
}

impl VerifierConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return Err(ConfigError::Invalid(format!(
                "detection_threshold must be in [0, 1], got {}",
                self.detection_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ConfigError::Invalid(format!(
                "match_threshold must be in [0, 1], got {}",
                self.match_threshold
            )));
        }
        if !(self.min_face_size > 0.0) {
            return Err(ConfigError::Invalid("min_face_size must be > 0".into()));
        }
        if self.min_crop_size == 0 {
            return Err(ConfigError::Invalid("min_crop_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.crop_margin) {
            return Err(ConfigError::Invalid(format!(
                "crop_margin must be in [0, 1], got {}",
                self.crop_margin
            )));
        }
        if self.embedding_dim == 0 {
            return Err(ConfigError::Invalid("embedding_dim must be > 0".into()));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::Invalid("intra_threads must be > 0".into()));
        }
        Ok(())
    }

    /// Path to the SSD detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join(&self.detector_model)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace embedding model.
    pub fn embedder_model_path(&self) -> String {
        self.model_dir
            .join(&self.embedder_model)
            .to_string_lossy()
            .into_owned()
    }
}
