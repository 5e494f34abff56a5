//! Deterministic content embeddings and the vector math shared by the index and reasoners.
//!
//! The generator is a frozen contract: a blake3 key derivation over the content feeds an
//! extendable output stream, each 8-byte little-endian chunk becomes one component in
//! `[-1, 1)`, and the result is L2-normalized. Changing any of these steps changes every
//! previously computed embedding, so bump [`GENERATOR_TAG`] if it ever has to change.

use std::collections::BTreeMap;

use nalgebra::DVectorView;
use serde::{Deserialize, Serialize};

use crate::error::{HybridError, HybridResult};

/// Key-derivation context for the blake3 seed hasher.
const DERIVE_KEY_CONTEXT: &str = "pagi-hybrid-reasoner embedding v1";

/// Value written to the `generator` metadata key of generated embeddings.
pub const GENERATOR_TAG: &str = "blake3-xof-v1";

pub const META_CONTENT_DIGEST: &str = "content_digest";
pub const META_CREATED_AT: &str = "created_at";
pub const META_GENERATOR: &str = "generator";

/// Reference embedding width.
pub const DEFAULT_DIMENSION: usize = 768;

/// A fixed-length vector representing some content, plus free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticEmbedding {
    pub id: String,
    pub vector: Vec<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SemanticEmbedding {
    pub fn new(id: impl Into<String>, vector: Vec<f64>, metadata: BTreeMap<String, String>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata,
        }
    }

    /// Re-keys the embedding, e.g. from its content digest to the goal that owns it.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    pub fn norm(&self) -> f64 {
        l2_norm(&self.vector)
    }

    pub fn content_digest(&self) -> Option<&str> {
        self.metadata.get(META_CONTENT_DIGEST).map(String::as_str)
    }
}

/// Hex blake3 digest of `content`, used as the content fingerprint in metadata.
pub fn content_digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Euclidean length of `v`.
pub fn l2_norm(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    DVectorView::from_slice(v, v.len()).norm()
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns `None` when the lengths differ or either vector has zero magnitude, since the
/// similarity is undefined in both cases.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let va = DVectorView::from_slice(a, a.len());
    let vb = DVectorView::from_slice(b, b.len());
    let denom = va.norm() * vb.norm();
    if denom <= f64::EPSILON {
        return None;
    }
    Some((va.dot(&vb) / denom).clamp(-1.0, 1.0))
}

/// Maps text content to unit-normalized vectors, deterministically.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingGenerator;

impl EmbeddingGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generates the embedding for `content`. The returned embedding is keyed by the content
    /// digest; callers that own the content under another id re-key it with
    /// [`SemanticEmbedding::with_id`].
    pub fn generate(&self, content: &str, dimension: usize) -> HybridResult<SemanticEmbedding> {
        if dimension == 0 {
            return Err(HybridError::InvalidDimension { dimension });
        }

        let digest = content_digest(content);
        let mut vector = Self::raw_components(content, dimension);

        let norm = l2_norm(&vector);
        if !norm.is_finite() || norm <= f64::EPSILON {
            return Err(HybridError::DegenerateEmbedding {
                content_digest: digest,
            });
        }
        for x in &mut vector {
            *x /= norm;
        }

        tracing::debug!(dimension, digest = %digest, "generated embedding");

        let mut metadata = BTreeMap::new();
        metadata.insert(META_CONTENT_DIGEST.to_string(), digest.clone());
        metadata.insert(META_CREATED_AT.to_string(), chrono::Utc::now().to_rfc3339());
        metadata.insert(META_GENERATOR.to_string(), GENERATOR_TAG.to_string());

        Ok(SemanticEmbedding::new(digest, vector, metadata))
    }

    /// Un-normalized components streamed from the keyed blake3 XOF.
    fn raw_components(content: &str, dimension: usize) -> Vec<f64> {
        let mut hasher = blake3::Hasher::new_derive_key(DERIVE_KEY_CONTEXT);
        hasher.update(content.as_bytes());
        let mut reader = hasher.finalize_xof();

        let mut buf = [0u8; 8];
        (0..dimension)
            .map(|_| {
                reader.fill(&mut buf);
                // Top 53 bits give an exactly representable fraction in [0, 1).
                let unit = (u64::from_le_bytes(buf) >> 11) as f64 / (1u64 << 53) as f64;
                unit * 2.0 - 1.0
            })
            .collect()
    }
}
