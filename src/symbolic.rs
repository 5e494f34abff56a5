//! Rule-based goal scoring.

use serde::{Deserialize, Serialize};

use crate::goal::{Goal, GoalPriority, GoalStatus};

pub const BASE_SCORE: f64 = 0.30;
pub const PROGRESS_WEIGHT: f64 = 0.20;
pub const NO_DEPENDENCY_BONUS: f64 = 0.10;
pub const HEAVY_DEPENDENCY_PENALTY: f64 = -0.10;
/// More dependencies than this are penalized.
pub const HEAVY_DEPENDENCY_THRESHOLD: usize = 3;
pub const ACTIVE_STATUS_BONUS: f64 = 0.10;

/// A single named contribution to the symbolic score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleContribution {
    pub rule: String,
    pub detail: String,
    pub value: f64,
}

/// Every contribution the symbolic reasoner applied to a goal, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicBreakdown {
    pub base: f64,
    pub contributions: Vec<RuleContribution>,
    /// Unclamped sum of `base` and all contributions.
    pub raw: f64,
    /// `raw` clamped to `[0, 1]`.
    pub score: f64,
}

impl SymbolicBreakdown {
    /// Contributions sorted by absolute effect, largest first, skipping those that did
    /// nothing.
    pub fn dominant(&self) -> Vec<&RuleContribution> {
        let mut out: Vec<&RuleContribution> =
            self.contributions.iter().filter(|c| c.value != 0.0).collect();
        out.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
        out
    }
}

fn priority_bonus(priority: GoalPriority) -> f64 {
    match priority {
        GoalPriority::Critical => 0.30,
        GoalPriority::High => 0.20,
        GoalPriority::Normal => 0.10,
        GoalPriority::Low => 0.00,
    }
}

fn dependency_adjustment(count: usize) -> f64 {
    match count {
        0 => NO_DEPENDENCY_BONUS,
        n if n <= HEAVY_DEPENDENCY_THRESHOLD => 0.0,
        _ => HEAVY_DEPENDENCY_PENALTY,
    }
}

/// Scores goals from their discrete features. Pure; holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolicReasoner;

impl SymbolicReasoner {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, goal: &Goal) -> f64 {
        self.breakdown(goal).score
    }

    pub fn breakdown(&self, goal: &Goal) -> SymbolicBreakdown {
        // Out-of-range progress is the validator's concern; here it only must not push the
        // contribution past its bounds.
        let progress = if goal.progress.is_nan() {
            0.0
        } else {
            goal.progress.clamp(0.0, 1.0)
        };
        let deps = goal.dependencies.len();

        let contributions = vec![
            RuleContribution {
                rule: "priority".to_string(),
                detail: goal.priority.as_label().to_string(),
                value: priority_bonus(goal.priority),
            },
            RuleContribution {
                rule: "progress".to_string(),
                detail: format!("{progress:.2}"),
                value: progress * PROGRESS_WEIGHT,
            },
            RuleContribution {
                rule: "dependencies".to_string(),
                detail: deps.to_string(),
                value: dependency_adjustment(deps),
            },
            RuleContribution {
                rule: "status".to_string(),
                detail: goal.status.as_label().to_string(),
                value: if goal.status == GoalStatus::Active {
                    ACTIVE_STATUS_BONUS
                } else {
                    0.0
                },
            },
        ];

        let raw = BASE_SCORE + contributions.iter().map(|c| c.value).sum::<f64>();
        SymbolicBreakdown {
            base: BASE_SCORE,
            contributions,
            raw,
            score: raw.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn best_case_goal_scores_one() {
        let goal = Goal::new("g")
            .with_priority(GoalPriority::Critical)
            .with_progress(1.0)
            .with_status(GoalStatus::Active);
        let score = SymbolicReasoner::new().score(&goal);
        assert!((score - 1.0).abs() < EPS, "got {score}");
        assert!(score <= 1.0);
    }

    #[test]
    fn worst_case_goal_stays_positive() {
        let goal = Goal::new("g")
            .with_priority(GoalPriority::Low)
            .with_progress(0.0)
            .with_status(GoalStatus::Failed)
            .with_dependencies(["a", "b", "c", "d"]);
        let score = SymbolicReasoner::new().score(&goal);
        assert!((score - 0.20).abs() < EPS, "got {score}");
    }

    #[test]
    fn dependency_bands() {
        assert_eq!(dependency_adjustment(0), NO_DEPENDENCY_BONUS);
        assert_eq!(dependency_adjustment(1), 0.0);
        assert_eq!(dependency_adjustment(3), 0.0);
        assert_eq!(dependency_adjustment(4), HEAVY_DEPENDENCY_PENALTY);
    }

    #[test]
    fn out_of_range_progress_is_clamped_for_scoring() {
        let r = SymbolicReasoner::new();
        let over = r.breakdown(&Goal::new("g").with_progress(7.5));
        assert!((over.contributions[1].value - PROGRESS_WEIGHT).abs() < EPS);
        let nan = r.breakdown(&Goal::new("g").with_progress(f64::NAN));
        assert_eq!(nan.contributions[1].value, 0.0);
        assert!(nan.score.is_finite());
    }

    #[test]
    fn dominant_orders_by_magnitude_and_skips_zero() {
        let goal = Goal::new("g")
            .with_priority(GoalPriority::Critical)
            .with_progress(0.25)
            .with_status(GoalStatus::Suspended)
            .with_dependencies(["a"]);
        let breakdown = SymbolicReasoner::new().breakdown(&goal);
        let rules: Vec<&str> = breakdown.dominant().iter().map(|c| c.rule.as_str()).collect();
        assert_eq!(rules, vec!["priority", "progress"]);
    }

    fn any_priority() -> impl Strategy<Value = GoalPriority> {
        prop_oneof![
            Just(GoalPriority::Low),
            Just(GoalPriority::Normal),
            Just(GoalPriority::High),
            Just(GoalPriority::Critical),
        ]
    }

    fn any_status() -> impl Strategy<Value = GoalStatus> {
        prop_oneof![
            Just(GoalStatus::Active),
            Just(GoalStatus::Suspended),
            Just(GoalStatus::Completed),
            Just(GoalStatus::Failed),
            Just(GoalStatus::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn score_is_always_in_unit_range(
            priority in any_priority(),
            status in any_status(),
            progress in -2.0f64..3.0,
            deps in 0usize..8,
        ) {
            let goal = Goal::new("g")
                .with_priority(priority)
                .with_status(status)
                .with_progress(progress)
                .with_dependencies((0..deps).map(|i| format!("d{i}")));
            let score = SymbolicReasoner::new().score(&goal);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn priority_is_monotone(
            status in any_status(),
            progress in 0.0f64..=1.0,
            deps in 0usize..6,
        ) {
            let r = SymbolicReasoner::new();
            let base = Goal::new("g")
                .with_status(status)
                .with_progress(progress)
                .with_dependencies((0..deps).map(|i| format!("d{i}")));
            let scores: Vec<f64> = [
                GoalPriority::Critical,
                GoalPriority::High,
                GoalPriority::Normal,
                GoalPriority::Low,
            ]
            .into_iter()
            .map(|p| r.score(&base.clone().with_priority(p)))
            .collect();
            prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
