//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::constraints::BuiltinChecks;
use crate::embedding::DEFAULT_DIMENSION;
use crate::error::{HybridError, HybridResult};

/// Weights applied when fusing the symbolic and neural scores. Must be non-negative and sum
/// to one so the fused score stays in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub symbolic: f64,
    pub neural: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            symbolic: 0.5,
            neural: 0.5,
        }
    }
}

impl FusionWeights {
    const SUM_TOLERANCE: f64 = 1e-9;

    pub fn validate(&self) -> HybridResult<()> {
        for (name, w) in [("symbolic", self.symbolic), ("neural", self.neural)] {
            if !w.is_finite() || w < 0.0 {
                return Err(HybridError::invalid_config(format!(
                    "{name} fusion weight must be a non-negative number, got {w}"
                )));
            }
        }
        let sum = self.symbolic + self.neural;
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(HybridError::invalid_config(format!(
                "fusion weights must sum to 1, got {sum}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Width of every embedding the engine generates or accepts.
    pub dimension: usize,
    pub fusion: FusionWeights,
    pub checks: BuiltinChecks,
    /// Reuse a goal's stored embedding when its content digest still matches.
    pub reuse_embeddings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            fusion: FusionWeights::default(),
            checks: BuiltinChecks::default(),
            reuse_embeddings: true,
        }
    }
}

impl EngineConfig {
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    /// Parses a JSON document; missing fields take their defaults. The result is validated.
    pub fn from_json_str(json: &str) -> HybridResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HybridResult<()> {
        if self.dimension == 0 {
            return Err(HybridError::invalid_config("dimension must be positive"));
        }
        self.fusion.validate()
    }
}
