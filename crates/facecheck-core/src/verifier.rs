//! ID-vs-selfie verification: detect → crop → embed → compare.
//!
//! Stages run in a fixed order and the first failure ends the request:
//!
//! ```text
//! detect_id → detect_selfie → embed_id → embed_selfie → compare
//! ```
//!
//! A missing face is a normal outcome, not a fault, and is never retried.

use crate::comparator::{Comparator, ComparisonError};
use crate::config::VerifierConfig;
use crate::detector::{DetectorError, FaceDetector, SsdFaceDetector};
use crate::embedder::{ArcFaceEmbedder, EmbeddingError, FaceEmbedder};
use crate::intake::crop_face;
use crate::quality::assess_quality;
use crate::types::{Embedding, FaceRegion, ImageKind, QualityPair, Verification};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("face not detected in {0} image")]
    FaceNotFound(ImageKind),
    #[error("face detection failed on {image} image: {source}")]
    Detector {
        image: ImageKind,
        source: DetectorError,
    },
    #[error("embedding failed on {image} image: {source}")]
    Embedding {
        image: ImageKind,
        source: EmbeddingError,
    },
    #[error("comparison failed: {0}")]
    Comparison(#[from] ComparisonError),
}

/// Serializable terminal result of one request, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationResult {
    Success(Verification),
    Error { error: String },
}

impl From<Result<Verification, VerifyError>> for VerificationResult {
    fn from(result: Result<Verification, VerifyError>) -> Self {
        match result {
            Ok(v) => VerificationResult::Success(v),
            Err(e) => VerificationResult::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Pipeline coordinator. Holds shared, immutable model handles and may be
/// used from many threads at once.
#[derive(Clone)]
pub struct Verifier {
    detector: Arc<dyn FaceDetector>,
    embedder: Arc<dyn FaceEmbedder>,
    comparator: Comparator,
    crop_margin: f32,
}

impl Verifier {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        embedder: Arc<dyn FaceEmbedder>,
        comparator: Comparator,
    ) -> Self {
        Self {
            detector,
            embedder,
            comparator,
            crop_margin: 0.0,
        }
    }

    /// Widen each detected box by this fraction per side before embedding.
    pub fn with_crop_margin(mut self, margin: f32) -> Self {
        self.crop_margin = margin;
        self
    }

    /// Load both ONNX models described by `config`. Fails fast if either is
    /// missing or cannot be initialized.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, LoadError> {
        config.validate()?;

        let detector = SsdFaceDetector::load(
            &config.detector_model_path(),
            config.detection_threshold,
            config.min_face_size,
            config.intra_threads,
        )?;
        let embedder = ArcFaceEmbedder::load(
            &config.embedder_model_path(),
            config.embedding_dim,
            config.min_crop_size,
            config.intra_threads,
        )?;
        let comparator =
            Comparator::new(config.match_threshold).with_expected_dim(config.embedding_dim);

        tracing::info!(
            match_threshold = config.match_threshold,
            detection_threshold = config.detection_threshold,
            "verifier ready"
        );

        Ok(Self::new(Arc::new(detector), Arc::new(embedder), comparator)
            .with_crop_margin(config.crop_margin))
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// Run the detector alone, for diagnostics.
    pub fn detect(&self, image: &RgbImage) -> Result<Option<FaceRegion>, DetectorError> {
        self.detector.detect(image)
    }

    /// Verify that `id_image` and `selfie_image` show the same person.
    pub fn verify(
        &self,
        id_image: &RgbImage,
        selfie_image: &RgbImage,
    ) -> Result<Verification, VerifyError> {
        let id_face = self.detect_stage(id_image, ImageKind::Aadhaar)?;
        let selfie_face = self.detect_stage(selfie_image, ImageKind::Selfie)?;

        let id_embedding = self.embed_stage(id_image, &id_face, ImageKind::Aadhaar)?;
        let selfie_embedding = self.embed_stage(selfie_image, &selfie_face, ImageKind::Selfie)?;

        tracing::debug!(stage = "compare", "comparing embeddings");
        let decision = self.comparator.compare(&id_embedding, &selfie_embedding)?;

        let quality = QualityPair {
            aadhaar: assess_quality(id_image, &id_face),
            selfie: assess_quality(selfie_image, &selfie_face),
        };

        tracing::info!(
            is_match = decision.is_match,
            confidence = decision.confidence,
            threshold = self.comparator.threshold(),
            "verification complete"
        );

        Ok(Verification {
            is_match: decision.is_match,
            confidence: decision.confidence,
            quality,
        })
    }

    fn detect_stage(&self, image: &RgbImage, kind: ImageKind) -> Result<FaceRegion, VerifyError> {
        tracing::debug!(stage = "detect", image = %kind, width = image.width(), height = image.height(), "detecting face");
        let face = self
            .detector
            .detect(image)
            .map_err(|source| VerifyError::Detector { image: kind, source })?;

        match face {
            Some(face) => {
                tracing::debug!(image = %kind, confidence = face.confidence, "face detected");
                Ok(face)
            }
            None => {
                tracing::info!(image = %kind, "no face detected");
                Err(VerifyError::FaceNotFound(kind))
            }
        }
    }

    fn embed_stage(
        &self,
        image: &RgbImage,
        face: &FaceRegion,
        kind: ImageKind,
    ) -> Result<Embedding, VerifyError> {
        tracing::debug!(stage = "embed", image = %kind, "extracting embedding");
        let crop = crop_face(image, face, self.crop_margin);
        self.embedder
            .embed(&crop)
            .map_err(|source| VerifyError::Embedding { image: kind, source })
    }
}

/// Failure to build a [`Verifier`] from configuration.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("embedder: {0}")]
    Embedder(#[from] EmbeddingError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QualityReport;

    #[test]
    fn test_face_not_found_message() {
        let err = VerifyError::FaceNotFound(ImageKind::Aadhaar);
        assert_eq!(err.to_string(), "face not detected in aadhaar image");
        let err = VerifyError::FaceNotFound(ImageKind::Selfie);
        assert_eq!(err.to_string(), "face not detected in selfie image");
    }

    #[test]
    fn test_result_serializes_error_status() {
        let result: VerificationResult = Err(VerifyError::FaceNotFound(ImageKind::Selfie)).into();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "face not detected in selfie image");
    }

    #[test]
    fn test_result_serializes_success_status() {
        let q = QualityReport { blur_score: 12.5, face_size_ratio: 0.25, brightness: 120.0 };
        let result: VerificationResult = Ok(Verification {
            is_match: true,
            confidence: 0.875,
            quality: QualityPair { aadhaar: q, selfie: q },
        })
        .into();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["match"], true);
        assert_eq!(json["confidence"], 0.875);
        assert_eq!(json["quality"]["aadhaar"]["face_size_ratio"], 0.25);
        assert_eq!(json["quality"]["selfie"]["brightness"], 120.0);
    }

    #[test]
    fn test_missing_models_fail_fast() {
        let config = VerifierConfig {
            model_dir: "/nonexistent/facecheck-models".into(),
            ..VerifierConfig::default()
        };
        match Verifier::from_config(&config) {
            Err(LoadError::Detector(DetectorError::ModelNotFound(path))) => {
                assert!(path.ends_with("res10_300x300_ssd_iter_140000.onnx"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected load failure"),
        }
    }
}
