//! Constraint checking over goals and their dependency graph.
//!
//! Violations are plain data attached to decisions. Nothing in this module returns an error
//! for a goal that breaks a rule.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HybridError, HybridResult};
use crate::goal::{Goal, GoalSet};

/// Severity levels used by the built-in checks.
pub struct Severity;

impl Severity {
    pub const CRITICAL: f64 = 1.0;
    pub const HIGH: f64 = 0.8;
}

pub const CIRCULAR_DEPENDENCY_ID: &str = "circular_dependency";
pub const PROGRESS_BOUNDS_ID: &str = "progress_bounds";
pub const STATUS_VALIDITY_ID: &str = "status_validity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    CircularDependency,
    ProgressOutOfBounds,
    InvalidStatus,
    Custom,
}

/// A structured report that a goal breaks an invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub constraint_id: String,
    pub kind: ViolationKind,
    pub severity: f64,
    pub message: String,
}

/// Predicate signature for caller-supplied constraints. Returns a message when the goal
/// violates the constraint, `None` otherwise.
pub type ConstraintPredicate = dyn Fn(&Goal, &GoalSet) -> Option<String> + Send + Sync;

/// A caller-supplied rule, immutable once built.
#[derive(Clone)]
pub struct SymbolicConstraint {
    id: String,
    weight: f64,
    predicate: Arc<ConstraintPredicate>,
}

impl SymbolicConstraint {
    pub fn new<F>(id: impl Into<String>, weight: f64, predicate: F) -> Self
    where
        F: Fn(&Goal, &GoalSet) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            weight,
            predicate: Arc::new(predicate),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Severity assigned to violations of this constraint.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    fn check(&self, goal: &Goal, goals: &GoalSet) -> Option<ConstraintViolation> {
        (self.predicate)(goal, goals).map(|message| ConstraintViolation {
            constraint_id: self.id.clone(),
            kind: ViolationKind::Custom,
            severity: self.weight,
            message,
        })
    }
}

impl fmt::Debug for SymbolicConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolicConstraint")
            .field("id", &self.id)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Toggles for the built-in checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinChecks {
    pub circular_dependency: bool,
    pub progress_bounds: bool,
    pub status_validity: bool,
}

impl Default for BuiltinChecks {
    fn default() -> Self {
        Self {
            circular_dependency: true,
            progress_bounds: true,
            status_validity: true,
        }
    }
}

/// Checks goals against the built-in rules, then any custom constraints in registration
/// order.
#[derive(Debug, Clone, Default)]
pub struct ConstraintValidator {
    checks: BuiltinChecks,
    custom: Vec<SymbolicConstraint>,
}

impl ConstraintValidator {
    /// Builds a validator, rejecting custom constraints with a blank or duplicate id, or a
    /// weight outside `[0, 1]`.
    pub fn new(checks: BuiltinChecks, custom: Vec<SymbolicConstraint>) -> HybridResult<Self> {
        let mut seen = HashSet::new();
        for c in &custom {
            if c.id.trim().is_empty() {
                return Err(HybridError::invalid_config("constraint id must not be blank"));
            }
            if !c.weight.is_finite() || !(0.0..=1.0).contains(&c.weight) {
                return Err(HybridError::invalid_config(format!(
                    "constraint {} has weight {} outside [0, 1]",
                    c.id, c.weight
                )));
            }
            if !seen.insert(c.id.as_str()) {
                return Err(HybridError::invalid_config(format!(
                    "duplicate constraint id {}",
                    c.id
                )));
            }
        }
        Ok(Self { checks, custom })
    }

    pub fn checks(&self) -> BuiltinChecks {
        self.checks
    }

    pub fn custom_constraints(&self) -> &[SymbolicConstraint] {
        &self.custom
    }

    pub fn validate(&self, goal: &Goal, goals: &GoalSet) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        if self.checks.circular_dependency {
            if let Some(cycle) = find_cycle(goal, goals) {
                violations.push(ConstraintViolation {
                    constraint_id: CIRCULAR_DEPENDENCY_ID.to_string(),
                    kind: ViolationKind::CircularDependency,
                    severity: Severity::CRITICAL,
                    message: format!("goal depends on itself: {}", cycle.join(" -> ")),
                });
            }
        }

        if self.checks.progress_bounds && !(0.0..=1.0).contains(&goal.progress) {
            violations.push(ConstraintViolation {
                constraint_id: PROGRESS_BOUNDS_ID.to_string(),
                kind: ViolationKind::ProgressOutOfBounds,
                severity: Severity::HIGH,
                message: format!("progress {} is outside [0, 1]", goal.progress),
            });
        }

        if self.checks.status_validity && !goal.status.is_valid() {
            violations.push(ConstraintViolation {
                constraint_id: STATUS_VALIDITY_ID.to_string(),
                kind: ViolationKind::InvalidStatus,
                severity: Severity::CRITICAL,
                message: format!("status {} is not a recognized goal status", goal.status.as_label()),
            });
        }

        violations.extend(self.custom.iter().filter_map(|c| c.check(goal, goals)));
        violations
    }
}

/// Breadth-first search from `goal`'s dependencies back to `goal`. Returns the shortest
/// cycle as a path starting and ending at `goal.id`. Dependencies that are not in `goals`
/// are treated as leaves.
fn find_cycle(goal: &Goal, goals: &GoalSet) -> Option<Vec<String>> {
    let start = goal.id.as_str();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for dep in &goal.dependencies {
        if dep == start {
            return Some(vec![start.to_string(), start.to_string()]);
        }
        if !parent.contains_key(dep.as_str()) {
            parent.insert(dep.as_str(), start);
            queue.push_back(dep.as_str());
        }
    }

    while let Some(current) = queue.pop_front() {
        let Some(node) = goals.get(current) else {
            continue;
        };
        for dep in &node.dependencies {
            if dep == start {
                let mut path = vec![start.to_string()];
                let mut cursor = current;
                while cursor != start {
                    path.push(cursor.to_string());
                    cursor = parent.get(cursor).copied().unwrap_or(start);
                }
                path.push(start.to_string());
                // Built backwards from the closing edge.
                path.reverse();
                return Some(path);
            }
            if dep != start && !parent.contains_key(dep.as_str()) {
                parent.insert(dep.as_str(), current);
                queue.push_back(dep.as_str());
            }
        }
    }
    None
}
