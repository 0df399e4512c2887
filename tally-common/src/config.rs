//! Course scoring configuration
//!
//! Deserialized from the per-course `scoring` object the host supplies.
//! Every field has a default so a course with no scoring block still gets
//! a working total set.

use serde::{Deserialize, Serialize};

/// Pass/fail thresholds governing the total set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Passmark {
    /// Whether pass/fail is evaluated at all
    pub is_enabled: bool,
    /// Require every scoring subset to be passed, not just the totals
    pub requires_passed_subsets: bool,
    /// Score threshold (scaled percentage or raw points per `is_scaled`)
    pub score: f64,
    /// Correctness threshold (scaled percentage or raw count per `is_scaled`)
    pub correctness: f64,
    /// Compare scaled percentages instead of raw values
    pub is_scaled: bool,
}

impl Default for Passmark {
    fn default() -> Self {
        Self {
            is_enabled: true,
            requires_passed_subsets: false,
            score: 60.0,
            correctness: 60.0,
            is_scaled: true,
        }
    }
}

/// Per-course scoring configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    /// Override for the total set id (default "total")
    pub id: Option<String>,
    /// Title written to the total objective description
    pub title: Option<String>,
    /// Pass/fail thresholds
    pub passmark: Passmark,
    /// Serve legacy completion semantics to old host templates
    pub is_backward_compatible: bool,
}
