//! Error types shared by every component of the hybrid reasoner.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type HybridResult<T> = Result<T, HybridError>;

/// Coarse classification of a [`HybridError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad dimension or weight; fatal at initialization.
    Configuration,
    /// Rejected per call, engine state untouched.
    Input,
    /// The engine handle was used after `shutdown`.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum HybridError {
    #[error("invalid embedding dimension: {dimension}")]
    InvalidDimension { dimension: usize },

    #[error("degenerate embedding for content digest {content_digest}: raw norm is zero")]
    DegenerateEmbedding { content_digest: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding not found: {id}")]
    NotFound { id: String },

    #[error("embedding {id} has no components")]
    EmptyEmbedding { id: String },

    #[error("goal not found: {id:?}")]
    MissingGoal { id: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("engine has been shut down")]
    EngineShutdown,

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl HybridError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfiguration { .. } | Self::ConfigParse(_) => ErrorCategory::Configuration,
            Self::EngineShutdown => ErrorCategory::Shutdown,
            Self::InvalidDimension { .. }
            | Self::DegenerateEmbedding { .. }
            | Self::DimensionMismatch { .. }
            | Self::NotFound { .. }
            | Self::EmptyEmbedding { .. }
            | Self::MissingGoal { .. } => ErrorCategory::Input,
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
