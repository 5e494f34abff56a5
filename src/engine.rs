//! The hybrid decision engine: embedding lookup, symbolic and neural scoring, fusion,
//! constraint validation and trace assembly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::constraints::{ConstraintValidator, ConstraintViolation};
use crate::decision::{HybridDecision, TraceStage, TraceStep};
use crate::embedding::{content_digest, EmbeddingGenerator, SemanticEmbedding};
use crate::error::{HybridError, HybridResult};
use crate::goal::{Goal, GoalSet};
use crate::index::{EmbeddingIndex, SimilarityMatch};
use crate::metrics::{EngineMetrics, MetricsRecorder};
use crate::neural::{NeuralBreakdown, NeuralReasoner};
use crate::symbolic::{SymbolicBreakdown, SymbolicReasoner};

/// Weighted scores closer than this are reported as agreeing rather than one side
/// dominating.
const BALANCE_TOLERANCE: f64 = 0.05;

/// Where the embedding used for a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    /// Freshly generated from the goal content and stored in the index.
    Generated,
    /// Previously generated from identical content.
    Reused,
    /// Registered by a caller without a content digest; used as-is.
    External,
}

impl EmbeddingSource {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Reused => "reused",
            Self::External => "external",
        }
    }
}

/// Orchestrates the reasoners over a shared embedding index.
///
/// Every method takes `&self`; the engine is meant to be shared across threads behind an
/// [`Arc`]. Several engines may share one index as long as their dimensions agree.
#[derive(Debug)]
pub struct HybridDecisionEngine {
    config: EngineConfig,
    index: Arc<EmbeddingIndex>,
    generator: EmbeddingGenerator,
    symbolic: SymbolicReasoner,
    neural: NeuralReasoner,
    validator: ConstraintValidator,
    metrics: MetricsRecorder,
}

impl HybridDecisionEngine {
    pub fn new(
        config: EngineConfig,
        index: Arc<EmbeddingIndex>,
        validator: ConstraintValidator,
    ) -> HybridResult<Self> {
        config.validate()?;
        if index.dimension() != config.dimension {
            return Err(HybridError::invalid_config(format!(
                "index dimension {} does not match configured dimension {}",
                index.dimension(),
                config.dimension
            )));
        }
        Ok(Self {
            config,
            index,
            generator: EmbeddingGenerator::new(),
            symbolic: SymbolicReasoner::new(),
            neural: NeuralReasoner::new(),
            validator,
            metrics: MetricsRecorder::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub fn validator(&self) -> &ConstraintValidator {
        &self.validator
    }

    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.snapshot()
    }

    /// Decides on the goal `goal_id` from `goals`, which also serves as the dependency graph
    /// for cross-goal constraints.
    #[tracing::instrument(level = "debug", skip(self, goals), fields(goal_count = goals.len()))]
    pub fn decide(&self, goal_id: &str, goals: &GoalSet) -> HybridResult<HybridDecision> {
        let goal = goals
            .get(goal_id)
            .filter(|_| !goal_id.trim().is_empty())
            .ok_or_else(|| HybridError::MissingGoal {
                id: goal_id.to_string(),
            })?;
        self.decide_goal(goal, goals)
    }

    /// Decides on `goal`, validating it against `goals`. The goal need not be a member of
    /// `goals`.
    pub fn decide_goal(&self, goal: &Goal, goals: &GoalSet) -> HybridResult<HybridDecision> {
        if goal.id.trim().is_empty() {
            return Err(HybridError::MissingGoal { id: goal.id.clone() });
        }
        let started = Instant::now();
        let mut trace = Vec::new();

        let (embedding, source) = self.embedding_for(goal)?;
        trace.push(TraceStep::new(
            TraceStage::Embedding,
            format!("{}:dimension", source.as_label()),
            embedding.dimension() as f64,
        ));

        let symbolic = self.symbolic.breakdown(goal);
        trace.push(TraceStep::new(TraceStage::Symbolic, "base", symbolic.base));
        for c in &symbolic.contributions {
            trace.push(TraceStep::new(
                TraceStage::Symbolic,
                format!("{}={}", c.rule, c.detail),
                c.value,
            ));
        }
        trace.push(TraceStep::new(TraceStage::Symbolic, "raw", symbolic.raw));
        trace.push(TraceStep::new(TraceStage::Symbolic, "score", symbolic.score));

        let neural = self.neural.breakdown(&embedding)?;
        trace.push(TraceStep::new(TraceStage::Neural, "magnitude", neural.magnitude));
        trace.push(TraceStep::new(TraceStage::Neural, "mean", neural.mean));
        trace.push(TraceStep::new(TraceStage::Neural, "variance", neural.variance));
        trace.push(TraceStep::new(TraceStage::Neural, "score", neural.score));

        let weights = self.config.fusion;
        let hybrid_score =
            (weights.symbolic * symbolic.score + weights.neural * neural.score).clamp(0.0, 1.0);
        let confidence = ((symbolic.score + neural.score) / 2.0).clamp(0.0, 1.0);
        trace.push(TraceStep::new(TraceStage::Fusion, "symbolic_weight", weights.symbolic));
        trace.push(TraceStep::new(TraceStage::Fusion, "neural_weight", weights.neural));
        trace.push(TraceStep::new(TraceStage::Fusion, "hybrid_score", hybrid_score));
        trace.push(TraceStep::new(TraceStage::Fusion, "confidence", confidence));

        let violations = self.validator.validate(goal, goals);
        for v in &violations {
            trace.push(TraceStep::new(TraceStage::Constraints, v.constraint_id.clone(), v.severity));
        }
        trace.push(TraceStep::new(
            TraceStage::Constraints,
            "violations",
            violations.len() as f64,
        ));
        if !violations.is_empty() {
            tracing::warn!(goal_id = %goal.id, count = violations.len(), "goal violates constraints");
        }

        let justification = self.justify(&symbolic, &neural, &violations);
        self.metrics.record_decision(started.elapsed(), violations.len());
        tracing::debug!(goal_id = %goal.id, hybrid_score, confidence, "decision made");

        Ok(HybridDecision {
            goal_id: goal.id.clone(),
            symbolic_score: symbolic.score,
            neural_score: neural.score,
            hybrid_score,
            confidence,
            justification,
            trace,
            violations,
        })
    }

    /// Decides on every goal in `goals`, best hybrid score first, ties by ascending id.
    pub fn rank(&self, goals: &GoalSet) -> HybridResult<Vec<HybridDecision>> {
        let mut decisions = goals
            .values()
            .map(|g| self.decide_goal(g, goals))
            .collect::<HybridResult<Vec<_>>>()?;
        decisions.sort_by(|a, b| {
            b.hybrid_score
                .total_cmp(&a.hybrid_score)
                .then_with(|| a.goal_id.cmp(&b.goal_id))
        });
        Ok(decisions)
    }

    /// Returns the stored embedding for `goal` when it is still current, otherwise generates,
    /// stores and returns a fresh one.
    pub fn embedding_for(&self, goal: &Goal) -> HybridResult<(SemanticEmbedding, EmbeddingSource)> {
        let content = goal.embedding_content();

        if self.config.reuse_embeddings {
            if let Ok(existing) = self.index.get(&goal.id) {
                let stored_digest = existing.content_digest().map(str::to_owned);
                match stored_digest {
                    None => return Ok((existing, EmbeddingSource::External)),
                    Some(d) if d == content_digest(content) => {
                        return Ok((existing, EmbeddingSource::Reused))
                    }
                    Some(_) => {
                        tracing::debug!(goal_id = %goal.id, "stored embedding is stale, regenerating");
                    }
                }
            }
        }

        let embedding = self
            .generator
            .generate(content, self.config.dimension)?
            .with_id(goal.id.clone());
        self.index.insert(embedding.clone())?;
        self.metrics.record_registration();
        Ok((embedding, EmbeddingSource::Generated))
    }

    pub fn register_embedding(
        &self,
        id: impl Into<String>,
        vector: Vec<f64>,
        metadata: BTreeMap<String, String>,
    ) -> HybridResult<()> {
        self.index.register(id, vector, metadata)?;
        self.metrics.record_registration();
        Ok(())
    }

    pub fn find_similar(
        &self,
        query: &[f64],
        k: usize,
        min_similarity: f64,
    ) -> HybridResult<Vec<SimilarityMatch>> {
        self.index.find_similar(query, k, min_similarity)
    }

    /// Neighbours of the stored embedding `id`, excluding `id` itself.
    pub fn similar_to(
        &self,
        id: &str,
        k: usize,
        min_similarity: f64,
    ) -> HybridResult<Vec<SimilarityMatch>> {
        let seed = self.index.get(id)?;
        self.index
            .find_similar_filtered(&seed.vector, k, min_similarity, |other| other != id)
    }

    fn justify(
        &self,
        symbolic: &SymbolicBreakdown,
        neural: &NeuralBreakdown,
        violations: &[ConstraintViolation],
    ) -> String {
        let weights = self.config.fusion;
        let s = weights.symbolic * symbolic.score;
        let n = weights.neural * neural.score;

        let lead = if (s - n).abs() < BALANCE_TOLERANCE {
            "symbolic and neural signals agree"
        } else if s > n {
            "symbolic reasoning dominated"
        } else {
            "neural signal dominated"
        };
        let mut out = format!("{lead} ({:.2} vs {:.2})", symbolic.score, neural.score);

        let factors: Vec<String> = symbolic
            .dominant()
            .into_iter()
            .take(2)
            .map(|c| format!("{}={} ({:+.2})", c.rule, c.detail, c.value))
            .collect();
        if factors.is_empty() {
            out.push_str("; no rule adjustments applied");
        } else {
            out.push_str("; top factors: ");
            out.push_str(&factors.join(", "));
        }

        if let Some(worst) = violations
            .iter()
            .reduce(|best, v| if v.severity > best.severity { v } else { best })
        {
            out.push_str(&format!(
                "; {} constraint violation(s), most severe: {} ({:.2})",
                violations.len(),
                worst.constraint_id,
                worst.severity
            ));
        }
        out
    }
}
