//! facecheck-core — ID document vs. selfie face verification.
//!
//! Uses a ResNet-10 SSD for face detection and ArcFace for embeddings,
//! both running via ONNX Runtime for CPU inference, and a cosine
//! comparator for the match decision.

pub mod comparator;
pub mod config;
pub mod detector;
pub mod embedder;
pub mod intake;
pub mod quality;
pub mod types;
pub mod verifier;

use std::path::PathBuf;

pub use comparator::{Comparator, ComparisonError};
pub use config::{ConfigError, VerifierConfig};
pub use detector::{DetectorError, FaceDetector, SsdFaceDetector};
pub use embedder::{ArcFaceEmbedder, EmbeddingError, FaceEmbedder};
pub use intake::{crop_face, decode_image, decode_image_file, ImageError};
pub use quality::assess_quality;
pub use types::{Embedding, FaceRegion, ImageKind, MatchDecision, QualityPair, QualityReport, Verification};
pub use verifier::{LoadError, VerificationResult, Verifier, VerifyError};

/// Default model directory: `$XDG_DATA_HOME/facecheck/models`, falling back
/// to `$HOME/.local/share/facecheck/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facecheck")
        .join("models")
}
