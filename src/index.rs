//! In-memory embedding index with linear-scan similarity search.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, SemanticEmbedding};
use crate::error::{HybridError, HybridResult};

/// One hit from [`EmbeddingIndex::find_similar`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub id: String,
    pub similarity: f64,
}

/// Stores embeddings of a single fixed dimension.
///
/// Reads take a shared lock and may run concurrently; `register` and `remove` take the
/// exclusive lock. Concurrent registrations of the same id resolve in lock acquisition order.
#[derive(Debug)]
pub struct EmbeddingIndex {
    dimension: usize,
    entries: RwLock<HashMap<String, SemanticEmbedding>>,
}

impl EmbeddingIndex {
    pub fn new(dimension: usize) -> HybridResult<Self> {
        if dimension == 0 {
            return Err(HybridError::InvalidDimension { dimension });
        }
        Ok(Self {
            dimension,
            entries: RwLock::new(HashMap::new()),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    // The map is never left half-updated by a panicking writer, so a poisoned lock still
    // guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SemanticEmbedding>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SemanticEmbedding>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `vector` under `id`, replacing any previous entry.
    pub fn register(
        &self,
        id: impl Into<String>,
        vector: Vec<f64>,
        metadata: BTreeMap<String, String>,
    ) -> HybridResult<()> {
        self.insert(SemanticEmbedding::new(id, vector, metadata))
    }

    /// Stores an already-built embedding, replacing any previous entry with the same id.
    pub fn insert(&self, embedding: SemanticEmbedding) -> HybridResult<()> {
        if embedding.vector.len() != self.dimension {
            return Err(HybridError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.vector.len(),
            });
        }
        tracing::debug!(id = %embedding.id, "registering embedding");
        self.write().insert(embedding.id.clone(), embedding);
        Ok(())
    }

    pub fn get(&self, id: &str) -> HybridResult<SemanticEmbedding> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| HybridError::NotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Removes the entry for `id`, returning it if present.
    pub fn remove(&self, id: &str) -> Option<SemanticEmbedding> {
        self.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns up to `k` stored ids whose cosine similarity to `query` is at least
    /// `min_similarity`, best first. Equal similarities are ordered by ascending id.
    pub fn find_similar(
        &self,
        query: &[f64],
        k: usize,
        min_similarity: f64,
    ) -> HybridResult<Vec<SimilarityMatch>> {
        self.find_similar_filtered(query, k, min_similarity, |_| true)
    }

    /// Same as [`find_similar`](Self::find_similar), restricted to ids accepted by `keep`.
    pub fn find_similar_filtered<F>(
        &self,
        query: &[f64],
        k: usize,
        min_similarity: f64,
        keep: F,
    ) -> HybridResult<Vec<SimilarityMatch>>
    where
        F: Fn(&str) -> bool,
    {
        if query.len() != self.dimension {
            return Err(HybridError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut matches: Vec<SimilarityMatch> = self
            .read()
            .values()
            .filter(|e| keep(e.id.as_str()))
            .filter_map(|e| {
                let similarity = cosine_similarity(query, &e.vector)?;
                (similarity >= min_similarity).then(|| SimilarityMatch {
                    id: e.id.clone(),
                    similarity,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(k);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(entries: &[(&str, Vec<f64>)]) -> EmbeddingIndex {
        let index = EmbeddingIndex::new(3).expect("valid dimension");
        for (id, v) in entries {
            index
                .register(*id, v.clone(), BTreeMap::new())
                .expect("register should succeed");
        }
        index
    }

    #[test]
    fn zero_dimension_index_is_rejected() {
        assert!(matches!(
            EmbeddingIndex::new(0),
            Err(HybridError::InvalidDimension { dimension: 0 })
        ));
    }

    #[test]
    fn wrong_length_vector_is_rejected() {
        let index = EmbeddingIndex::new(768).expect("valid dimension");
        let err = index
            .register("g1", vec![0.1; 500], BTreeMap::new())
            .expect_err("500 != 768");
        assert!(matches!(
            err,
            HybridError::DimensionMismatch {
                expected: 768,
                actual: 500
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let index = index_with(&[("a", vec![1.0, 0.0, 0.0])]);
        let mut meta = BTreeMap::new();
        meta.insert("source".to_string(), "second".to_string());
        index
            .register("a", vec![0.0, 1.0, 0.0], meta)
            .expect("overwrite");

        let got = index.get("a").expect("present");
        assert_eq!(got.vector, vec![0.0, 1.0, 0.0]);
        assert_eq!(got.metadata.get("source").map(String::as_str), Some("second"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn missing_id_is_not_found() {
        let index = index_with(&[]);
        assert!(matches!(index.get("nope"), Err(HybridError::NotFound { id }) if id == "nope"));
    }

    #[test]
    fn k_limits_results_and_ties_break_by_id() {
        // "b" and "c" are identical, so they tie.
        let index = index_with(&[
            ("c", vec![1.0, 1.0, 0.0]),
            ("b", vec![1.0, 1.0, 0.0]),
            ("a", vec![0.0, 0.0, 1.0]),
        ]);
        let hits = index
            .find_similar(&[1.0, 1.0, 0.0], 2, -1.0)
            .expect("query");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[1].id, "c");
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[test]
    fn results_are_ordered_by_descending_similarity() {
        let index = index_with(&[
            ("far", vec![0.0, 1.0, 0.0]),
            ("near", vec![1.0, 0.1, 0.0]),
            ("mid", vec![1.0, 1.0, 0.0]),
        ]);
        let hits = index.find_similar(&[1.0, 0.0, 0.0], 3, -1.0).expect("query");
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
    }

    #[test]
    fn min_similarity_and_zero_k_filter() {
        let index = index_with(&[("x", vec![1.0, 0.0, 0.0]), ("y", vec![0.0, 1.0, 0.0])]);
        let hits = index.find_similar(&[1.0, 0.0, 0.0], 10, 0.5).expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "x");

        assert!(index
            .find_similar(&[1.0, 0.0, 0.0], 0, -1.0)
            .expect("query")
            .is_empty());
    }

    #[test]
    fn query_of_wrong_length_is_rejected() {
        let index = index_with(&[("x", vec![1.0, 0.0, 0.0])]);
        assert!(matches!(
            index.find_similar(&[1.0, 0.0], 1, 0.0),
            Err(HybridError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn zero_vectors_never_match() {
        let index = index_with(&[("zero", vec![0.0, 0.0, 0.0]), ("x", vec![1.0, 0.0, 0.0])]);
        let hits = index.find_similar(&[1.0, 0.0, 0.0], 5, -1.0).expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "x");
    }

    #[test]
    fn remove_and_ids() {
        let index = index_with(&[("b", vec![1.0, 0.0, 0.0]), ("a", vec![0.0, 1.0, 0.0])]);
        assert_eq!(index.ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(index.remove("a").is_some());
        assert!(!index.contains("a"));
        assert!(index.remove("a").is_none());
    }
}
