//! Embedding comparison and the match decision.

use crate::types::{Embedding, MatchDecision};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ComparisonError {
    #[error("embedding is empty")]
    Empty,
    #[error("embedding dimensions differ: {0} vs {1}")]
    DimensionMismatch(usize, usize),
    #[error("embedding has {actual} dimensions, expected {expected}")]
    WrongDimension { expected: usize, actual: usize },
    #[error("embedding contains non-finite values")]
    NonFinite,
    #[error("embedding has zero norm")]
    ZeroNorm,
}

/// Cosine comparator with a configurable match threshold.
///
/// Confidence is cosine similarity rescaled from [-1, 1] to [0, 1]; a pair
/// matches when `confidence >= threshold`.
#[derive(Debug, Clone)]
pub struct Comparator {
    threshold: f32,
    expected_dim: Option<usize>,
}

impl Comparator {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            expected_dim: None,
        }
    }

    /// Also reject embeddings whose length is not `dim`.
    pub fn with_expected_dim(mut self, dim: usize) -> Self {
        self.expected_dim = Some(dim);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Compare two embeddings. Symmetric in its arguments.
    pub fn compare(&self, a: &Embedding, b: &Embedding) -> Result<MatchDecision, ComparisonError> {
        self.check(a)?;
        self.check(b)?;
        if a.dim() != b.dim() {
            return Err(ComparisonError::DimensionMismatch(a.dim(), b.dim()));
        }

        let cosine = a.similarity(b);
        if !cosine.is_finite() {
            return Err(ComparisonError::NonFinite);
        }
        let cosine = cosine.clamp(-1.0, 1.0);
        let confidence = (cosine + 1.0) / 2.0;

        Ok(self.decide(confidence))
    }

    /// Apply the threshold to an already computed confidence.
    pub fn decide(&self, confidence: f32) -> MatchDecision {
        MatchDecision {
            is_match: confidence >= self.threshold,
            confidence,
        }
    }

    fn check(&self, e: &Embedding) -> Result<(), ComparisonError> {
        if e.values.is_empty() {
            return Err(ComparisonError::Empty);
        }
        if let Some(expected) = self.expected_dim {
            if e.dim() != expected {
                return Err(ComparisonError::WrongDimension {
                    expected,
                    actual: e.dim(),
                });
            }
        }
        if e.values.iter().any(|v| !v.is_finite()) {
            return Err(ComparisonError::NonFinite);
        }
        if e.values.iter().all(|&v| v == 0.0) {
            return Err(ComparisonError::ZeroNorm);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_compare_self_is_match() {
        let e = emb(&[0.3, -0.2, 0.9, 0.1]);
        let d = Comparator::new(0.65).compare(&e, &e).unwrap();
        assert!(d.is_match);
        assert!((d.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_compare_self_large_and_tiny_components() {
        let c = Comparator::new(0.65);

        let large = emb(&[1e20, 1e20, 1e20]);
        let d = c.compare(&large, &large).unwrap();
        assert!(d.is_match);
        assert!((d.confidence - 1.0).abs() < 1e-6);

        let tiny = emb(&[1e-30, 1e-30]);
        let d = c.compare(&tiny, &tiny).unwrap();
        assert!(d.is_match);
        assert!((d.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_compare_symmetric() {
        let a = emb(&[0.3, -0.2, 0.9, 0.1]);
        let b = emb(&[-0.5, 0.4, 0.2, 0.7]);
        let c = Comparator::new(0.65);
        let ab = c.compare(&a, &b).unwrap();
        let ba = c.compare(&b, &a).unwrap();
        assert_eq!(ab.confidence, ba.confidence);
        assert_eq!(ab.is_match, ba.is_match);
    }

    #[test]
    fn test_confidence_scaling() {
        let c = Comparator::new(0.65);
        let orthogonal = c.compare(&emb(&[1.0, 0.0]), &emb(&[0.0, 1.0])).unwrap();
        assert!((orthogonal.confidence - 0.5).abs() < 1e-6);
        assert!(!orthogonal.is_match);

        let opposite = c.compare(&emb(&[1.0, 0.0]), &emb(&[-1.0, 0.0])).unwrap();
        assert!(opposite.confidence.abs() < 1e-6);
    }

    #[test]
    fn test_threshold_boundary() {
        // Orthogonal vectors give exactly 0.5.
        let a = emb(&[1.0, 0.0]);
        let b = emb(&[0.0, 1.0]);
        assert!(Comparator::new(0.5).compare(&a, &b).unwrap().is_match);
        assert!(!Comparator::new(0.5 + f32::EPSILON).compare(&a, &b).unwrap().is_match);
    }

    #[test]
    fn test_decide_boundary() {
        let c = Comparator::new(0.65);
        assert!(c.decide(0.65).is_match);
        assert!(!c.decide(0.649_999).is_match);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = Comparator::new(0.65)
            .compare(&emb(&[1.0, 0.0]), &emb(&[1.0, 0.0, 0.0]))
            .unwrap_err();
        assert_eq!(err, ComparisonError::DimensionMismatch(2, 3));
    }

    #[test]
    fn test_expected_dimension() {
        let c = Comparator::new(0.65).with_expected_dim(3);
        let err = c.compare(&emb(&[1.0, 0.0]), &emb(&[1.0, 0.0])).unwrap_err();
        assert_eq!(err, ComparisonError::WrongDimension { expected: 3, actual: 2 });
    }

    #[test]
    fn test_malformed_embeddings() {
        let c = Comparator::new(0.65);
        let good = emb(&[1.0, 0.0]);
        assert_eq!(c.compare(&emb(&[]), &good).unwrap_err(), ComparisonError::Empty);
        assert_eq!(
            c.compare(&good, &emb(&[f32::NAN, 1.0])).unwrap_err(),
            ComparisonError::NonFinite
        );
        assert_eq!(
            c.compare(&good, &emb(&[0.0, 0.0])).unwrap_err(),
            ComparisonError::ZeroNorm
        );
    }
}
