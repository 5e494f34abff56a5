//! The decision record returned to callers.

use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintViolation;

/// Which part of the pipeline produced a trace value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    Embedding,
    Symbolic,
    Neural,
    Fusion,
    Constraints,
}

/// One intermediate value of a decision, in computation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub stage: TraceStage,
    pub label: String,
    pub value: f64,
}

impl TraceStep {
    pub(crate) fn new(stage: TraceStage, label: impl Into<String>, value: f64) -> Self {
        Self {
            stage,
            label: label.into(),
            value,
        }
    }
}

/// Fused assessment of a goal, with everything needed to explain it.
///
/// All scores lie in `[0, 1]`. A decision is built once and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridDecision {
    pub goal_id: String,
    pub symbolic_score: f64,
    pub neural_score: f64,
    pub hybrid_score: f64,
    /// Mean of the symbolic and neural scores.
    pub confidence: f64,
    pub justification: String,
    pub trace: Vec<TraceStep>,
    pub violations: Vec<ConstraintViolation>,
}

impl HybridDecision {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Highest-severity violation; the first one reported wins ties.
    pub fn most_severe(&self) -> Option<&ConstraintViolation> {
        self.violations
            .iter()
            .reduce(|best, v| if v.severity > best.severity { v } else { best })
    }

    pub fn trace_for(&self, stage: TraceStage) -> impl Iterator<Item = &TraceStep> {
        self.trace.iter().filter(move |s| s.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ViolationKind;

    fn violation(id: &str, severity: f64) -> ConstraintViolation {
        ConstraintViolation {
            constraint_id: id.to_string(),
            kind: ViolationKind::Custom,
            severity,
            message: String::new(),
        }
    }

    fn decision(violations: Vec<ConstraintViolation>) -> HybridDecision {
        HybridDecision {
            goal_id: "g".to_string(),
            symbolic_score: 0.8,
            neural_score: 0.3,
            hybrid_score: 0.55,
            confidence: 0.55,
            justification: String::new(),
            trace: vec![
                TraceStep::new(TraceStage::Symbolic, "score", 0.8),
                TraceStep::new(TraceStage::Neural, "score", 0.3),
            ],
            violations,
        }
    }

    #[test]
    fn most_severe_prefers_first_on_ties() {
        let d = decision(vec![violation("a", 0.8), violation("b", 1.0), violation("c", 1.0)]);
        assert_eq!(d.most_severe().map(|v| v.constraint_id.as_str()), Some("b"));
        assert!(!d.is_clean());
        assert!(decision(Vec::new()).most_severe().is_none());
    }

    #[test]
    fn trace_for_filters_by_stage() {
        let d = decision(Vec::new());
        let neural: Vec<_> = d.trace_for(TraceStage::Neural).collect();
        assert_eq!(neural.len(), 1);
        assert_eq!(neural[0].value, 0.3);
    }

    #[test]
    fn decision_serializes_with_snake_case_stages() {
        let json = serde_json::to_value(decision(Vec::new())).expect("serializable");
        assert_eq!(json["trace"][0]["stage"], "symbolic");
        assert_eq!(json["goal_id"], "g");
    }
}
