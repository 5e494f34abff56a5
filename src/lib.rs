//! Phoenix AGI (PAGI) hybrid reasoner.
//!
//! This crate fuses a rule-based ("symbolic") assessment of a goal with a vector-based
//! ("neural") assessment of its embedding into a single, explainable decision:
//! - [`Goal`]: the caller-owned unit of work being assessed.
//! - [`EmbeddingGenerator`] / [`EmbeddingIndex`]: deterministic content embeddings and the
//!   shared store used for similarity search.
//! - [`SymbolicReasoner`] / [`NeuralReasoner`]: the two independent scorers.
//! - [`ConstraintValidator`]: built-in and caller-supplied goal constraints.
//! - [`HybridDecisionEngine`]: orchestration, fusion, justification and trace.
//! - [`EngineHandle`]: the narrow API front ends talk to.
//!
//! Everything is CPU-bound and synchronous. Engines are plain values, so several can live in
//! one process, each with its own index or sharing one.

pub mod config;
pub mod constraints;
pub mod decision;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod goal;
pub mod handle;
pub mod index;
pub mod metrics;
pub mod neural;
pub mod symbolic;
pub mod telemetry;

pub use config::{EngineConfig, FusionWeights};
pub use constraints::{
    BuiltinChecks, ConstraintPredicate, ConstraintValidator, ConstraintViolation, Severity,
    SymbolicConstraint, ViolationKind,
};
pub use decision::{HybridDecision, TraceStage, TraceStep};
pub use embedding::{cosine_similarity, EmbeddingGenerator, SemanticEmbedding, DEFAULT_DIMENSION};
pub use engine::{EmbeddingSource, HybridDecisionEngine};
pub use error::{ErrorCategory, HybridError, HybridResult};
pub use goal::{goal_set, Goal, GoalPriority, GoalSet, GoalStatus};
pub use handle::EngineHandle;
pub use index::{EmbeddingIndex, SimilarityMatch};
pub use metrics::EngineMetrics;
pub use neural::{NeuralBreakdown, NeuralReasoner};
pub use symbolic::{RuleContribution, SymbolicBreakdown, SymbolicReasoner};
