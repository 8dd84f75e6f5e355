//! Reward threshold configuration and evaluation.
//!
//! The source system hard-coded its thresholds in two diverging reward
//! calculators; here they live in one table of
//! `(metric, threshold, reward_name, points)` tuples evaluated by a single
//! function. Duplicate grants are suppressed at the storage layer by the
//! `(custom_id, course_id, reward_name)` uniqueness constraint, not by this
//! module.

use serde::{Deserialize, Serialize};

/// Axis a reward rule is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Course-level completion rollup percentage.
    Completion,
    /// Best quiz score percentage for the course.
    QuizScore,
}

/// One configured reward band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardRule {
    pub metric: Metric,
    /// Minimum percentage (inclusive) at which the reward is granted.
    pub threshold: i32,
    pub name: &'static str,
    pub points: i32,
}

/// The complete reward configuration, highest band first per metric.
pub const RULES: [RewardRule; 5] = [
    RewardRule { metric: Metric::Completion, threshold: 100, name: "course-complete", points: 100 },
    RewardRule { metric: Metric::Completion, threshold: 80, name: "course-advanced", points: 50 },
    RewardRule { metric: Metric::Completion, threshold: 50, name: "course-halfway", points: 25 },
    RewardRule { metric: Metric::QuizScore, threshold: 90, name: "quiz-excellence", points: 40 },
    RewardRule { metric: Metric::QuizScore, threshold: 75, name: "quiz-merit", points: 20 },
];

/// Every rule on `metric` whose threshold `percent` meets or exceeds.
///
/// A student crossing several bands at once earns each of them; previously
/// earned bands are deduplicated by the rewards table constraint.
#[must_use]
pub fn qualifying(metric: Metric, percent: i32) -> impl Iterator<Item = &'static RewardRule> {
    RULES
        .iter()
        .filter(move |rule| rule.metric == metric && percent >= rule.threshold)
}
