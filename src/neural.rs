//! Statistics-based scoring of embeddings.

use nalgebra::DVectorView;
use serde::{Deserialize, Serialize};

use crate::embedding::SemanticEmbedding;
use crate::error::{HybridError, HybridResult};

pub const MAGNITUDE_WEIGHT: f64 = 0.3;
pub const VARIANCE_WEIGHT: f64 = 0.7;

/// Intermediate statistics behind a neural score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuralBreakdown {
    pub magnitude: f64,
    pub mean: f64,
    /// Population variance of the components.
    pub variance: f64,
    pub score: f64,
}

/// Scores an embedding from its magnitude (activation strength) and component variance
/// (information diversity).
#[derive(Debug, Clone, Copy, Default)]
pub struct NeuralReasoner;

impl NeuralReasoner {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, embedding: &SemanticEmbedding) -> HybridResult<f64> {
        Ok(self.breakdown(embedding)?.score)
    }

    /// The magnitude is recomputed rather than assumed to be 1, so externally registered
    /// vectors that were never normalized are scored on what they actually contain.
    pub fn breakdown(&self, embedding: &SemanticEmbedding) -> HybridResult<NeuralBreakdown> {
        let v = &embedding.vector;
        if v.is_empty() {
            return Err(HybridError::EmptyEmbedding {
                id: embedding.id.clone(),
            });
        }

        let view = DVectorView::from_slice(v, v.len());
        let magnitude = view.norm();
        let mean = view.mean();
        let variance = view.add_scalar(-mean).norm_squared() / v.len() as f64;

        let raw = MAGNITUDE_WEIGHT * magnitude + VARIANCE_WEIGHT * variance;
        let score = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };

        Ok(NeuralBreakdown {
            magnitude,
            mean,
            variance,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::embedding::EmbeddingGenerator;

    fn emb(vector: Vec<f64>) -> SemanticEmbedding {
        SemanticEmbedding::new("e", vector, BTreeMap::new())
    }

    #[test]
    fn empty_embedding_is_rejected() {
        let err = NeuralReasoner::new()
            .score(&emb(Vec::new()))
            .expect_err("empty vector must fail");
        assert!(matches!(err, HybridError::EmptyEmbedding { id } if id == "e"));
    }

    #[test]
    fn statistics_of_a_small_vector() {
        // mean 0.5, deviations +-0.5, variance 0.25, magnitude 1.
        let b = NeuralReasoner::new()
            .breakdown(&emb(vec![1.0, 0.0]))
            .expect("scored");
        assert!((b.magnitude - 1.0).abs() < 1e-12);
        assert!((b.mean - 0.5).abs() < 1e-12);
        assert!((b.variance - 0.25).abs() < 1e-12);
        assert!((b.score - (0.3 + 0.7 * 0.25)).abs() < 1e-12);
    }

    #[test]
    fn unnormalized_vectors_are_clamped() {
        let score = NeuralReasoner::new()
            .score(&emb(vec![10.0, -10.0, 10.0]))
            .expect("scored");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn generated_embedding_scores_in_range() {
        let e = EmbeddingGenerator::new()
            .generate("plan the quarterly review", 768)
            .expect("generated");
        let b = NeuralReasoner::new().breakdown(&e).expect("scored");
        assert!((b.magnitude - 1.0).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&b.score));
        // Unit vector of width 768: variance is close to 1/768.
        assert!(b.variance > 0.0 && b.variance < 0.01);
    }
}
