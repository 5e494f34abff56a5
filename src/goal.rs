//! Goals: the unit of work the engine reasons about.
//!
//! Goals are created and owned by the caller. Nothing in this crate mutates a goal; the
//! reasoners, validator and engine only ever borrow them.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// A set of goals keyed by their identifier, used for cross-goal checks.
pub type GoalSet = HashMap<String, Goal>;

/// Goal priority. Ordering follows urgency: `Critical > High > Normal > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl GoalPriority {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Lifecycle status of a goal.
///
/// `Unknown` absorbs any label that is not part of the closed status set (for example a
/// goal deserialized from an older front end). It is representable so that it can be
/// reported as a constraint violation instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Suspended,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl GoalStatus {
    /// Members of the closed status set.
    pub const VALID: [GoalStatus; 4] = [
        GoalStatus::Active,
        GoalStatus::Suspended,
        GoalStatus::Completed,
        GoalStatus::Failed,
    ];

    pub fn is_valid(&self) -> bool {
        Self::VALID.contains(self)
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// A unit of work with priority, progress, status and dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    /// Free text describing the goal; this is what gets embedded.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: GoalPriority,
    /// Fraction complete. Expected in `[0.0, 1.0]`; out-of-range values are reported by the
    /// validator rather than rejected here.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl Goal {
    /// Creates an active, normal-priority goal with no progress and no dependencies.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            priority: GoalPriority::default(),
            progress: 0.0,
            status: GoalStatus::default(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: GoalPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_status(mut self, status: GoalStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Text fed to the embedding generator. Falls back to the id when the description is
    /// blank so that every goal still gets a stable embedding.
    pub fn embedding_content(&self) -> &str {
        let trimmed = self.description.trim();
        if trimmed.is_empty() {
            &self.id
        } else {
            trimmed
        }
    }
}

/// Builds a [`GoalSet`] from an iterator of goals. Later goals replace earlier ones with the
/// same id.
pub fn goal_set<I: IntoIterator<Item = Goal>>(goals: I) -> GoalSet {
    goals.into_iter().map(|g| (g.id.clone(), g)).collect()
}
