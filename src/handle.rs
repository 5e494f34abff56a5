//! The narrow API consumed by front ends: initialize, decide, register, query, metrics and
//! shutdown.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::EngineConfig;
use crate::constraints::{ConstraintValidator, SymbolicConstraint};
use crate::decision::HybridDecision;
use crate::embedding::SemanticEmbedding;
use crate::engine::HybridDecisionEngine;
use crate::error::{HybridError, HybridResult};
use crate::goal::{goal_set, Goal, GoalSet};
use crate::index::{EmbeddingIndex, SimilarityMatch};
use crate::metrics::EngineMetrics;

/// Owning handle to one engine instance.
///
/// The handle is `Send + Sync`; share it behind an `Arc` for concurrent callers. After
/// [`shutdown`](Self::shutdown) every operation fails with [`HybridError::EngineShutdown`].
pub struct EngineHandle {
    engine: RwLock<Option<Arc<HybridDecisionEngine>>>,
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let engine = self
            .engine
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if engine.is_some() {
            tracing::debug!("engine handle dropped without explicit shutdown, releasing resources");
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.engine.read().unwrap_or_else(PoisonError::into_inner);
        let mut s = f.debug_struct("EngineHandle");
        match guard.as_ref() {
            Some(engine) => s
                .field("dimension", &engine.config().dimension)
                .field("embeddings", &engine.index().len())
                .field("custom_constraints", &engine.validator().custom_constraints().len()),
            None => s.field("shut_down", &true),
        };
        s.finish()
    }
}

impl EngineHandle {
    /// Creates an engine with default settings for the given embedding dimension.
    pub fn initialize(dimension: usize, constraints: Vec<SymbolicConstraint>) -> HybridResult<Self> {
        Self::with_config(EngineConfig::with_dimension(dimension), constraints)
    }

    /// Creates an engine with its own, empty embedding index.
    pub fn with_config(
        config: EngineConfig,
        constraints: Vec<SymbolicConstraint>,
    ) -> HybridResult<Self> {
        config.validate()?;
        let index = Arc::new(EmbeddingIndex::new(config.dimension)?);
        Self::with_index(config, index, constraints)
    }

    /// Creates an engine over an existing index, which may be shared with other engines.
    pub fn with_index(
        config: EngineConfig,
        index: Arc<EmbeddingIndex>,
        constraints: Vec<SymbolicConstraint>,
    ) -> HybridResult<Self> {
        let validator = ConstraintValidator::new(config.checks, constraints)?;
        let engine = HybridDecisionEngine::new(config, index, validator)?;
        tracing::info!(
            dimension = engine.config().dimension,
            custom_constraints = engine.validator().custom_constraints().len(),
            "hybrid engine initialized"
        );
        Ok(Self {
            engine: RwLock::new(Some(Arc::new(engine))),
        })
    }

    fn engine(&self) -> HybridResult<Arc<HybridDecisionEngine>> {
        let guard = self.engine.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().cloned().ok_or_else(|| {
            tracing::warn!("engine used after shutdown");
            HybridError::EngineShutdown
        })
    }

    /// Decides on `goal_id`, using `goals` as the dependency graph.
    pub fn decide(&self, goal_id: &str, goals: &GoalSet) -> HybridResult<HybridDecision> {
        self.engine()?.decide(goal_id, goals)
    }

    /// Decides on a standalone goal; only its own dependencies are visible to the validator.
    pub fn decide_goal(&self, goal: &Goal) -> HybridResult<HybridDecision> {
        let goals = goal_set([goal.clone()]);
        self.engine()?.decide(&goal.id, &goals)
    }

    pub fn rank(&self, goals: &GoalSet) -> HybridResult<Vec<HybridDecision>> {
        self.engine()?.rank(goals)
    }

    pub fn register_embedding(
        &self,
        id: impl Into<String>,
        vector: Vec<f64>,
        metadata: BTreeMap<String, String>,
    ) -> HybridResult<()> {
        self.engine()?.register_embedding(id, vector, metadata)
    }

    pub fn get_embedding(&self, id: &str) -> HybridResult<SemanticEmbedding> {
        self.engine()?.index().get(id)
    }

    pub fn remove_embedding(&self, id: &str) -> HybridResult<Option<SemanticEmbedding>> {
        Ok(self.engine()?.index().remove(id))
    }

    pub fn find_similar_embeddings(
        &self,
        vector: &[f64],
        k: usize,
        min_similarity: f64,
    ) -> HybridResult<Vec<SimilarityMatch>> {
        self.engine()?.find_similar(vector, k, min_similarity)
    }

    /// Goals whose stored embeddings are closest to `goal_id`'s, excluding the goal itself.
    pub fn similar_goals(
        &self,
        goal_id: &str,
        k: usize,
        min_similarity: f64,
    ) -> HybridResult<Vec<SimilarityMatch>> {
        self.engine()?.similar_to(goal_id, k, min_similarity)
    }

    pub fn metrics(&self) -> HybridResult<EngineMetrics> {
        Ok(self.engine()?.metrics())
    }

    /// Releases the engine, its index reference and its rule set. Calling it again is a
    /// no-op. Calls already in flight finish against the released engine.
    pub fn shutdown(&self) {
        let released = self
            .engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(engine) = released {
            let metrics = engine.metrics();
            tracing::info!(
                decisions = metrics.decisions,
                registrations = metrics.registrations,
                violations = metrics.violations,
                "hybrid engine shut down"
            );
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
