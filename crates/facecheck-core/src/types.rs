use serde::{Deserialize, Serialize};
use std::fmt;

/// A detected face: bounding box in source-image pixels plus detection confidence.
///
/// Regions handed out by a detector always lie within the image they were
/// detected in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
}

impl FaceRegion {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True if the box lies entirely inside a `width` × `height` image.
    #[cfg(test)]
    pub(crate) fn is_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= width as f32
            && self.y + self.height <= height as f32
    }
}

/// Face embedding vector (typically 512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity in [-1, 1]. Zero if either vector has zero norm.
    ///
    /// Sums are accumulated in `f64`, so any finite `f32` components neither
    /// overflow nor vanish when squared.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;

        for (&a, &b) in self.values.iter().zip(other.values.iter()) {
            let (a, b) = (f64::from(a), f64::from(b));
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { (dot / denom) as f32 } else { 0.0 }
    }
}

/// Which of the two request images a stage was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// The identity document (Aadhaar card) image.
    Aadhaar,
    Selfie,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Aadhaar => f.write_str("aadhaar"),
            ImageKind::Selfie => f.write_str("selfie"),
        }
    }
}

/// Per-image diagnostics. Informational only: never feeds the match decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Variance of the Laplacian over the face region. Higher = sharper.
    pub blur_score: f32,
    /// Face box area divided by image area, in [0, 1].
    pub face_size_ratio: f32,
    /// Mean luma of the face region (0–255).
    pub brightness: f32,
}

/// Quality diagnostics for both request images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityPair {
    pub aadhaar: QualityReport,
    pub selfie: QualityReport,
}

/// Outcome of comparing two embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchDecision {
    #[serde(rename = "match")]
    pub is_match: bool,
    /// Cosine similarity rescaled to [0, 1].
    pub confidence: f32,
}

/// A completed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(rename = "match")]
    pub is_match: bool,
    pub confidence: f32,
    pub quality: QualityPair,
}
