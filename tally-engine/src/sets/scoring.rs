//! Scoring surface of a set
//!
//! Aggregates score, correctness, completion, and pass/fail over a set's
//! available questions, and drives objective persistence on completion
//! and pass edges.

use super::{ContentSet, LifecycleSet, SetCore};
use crate::state::Objective;
use std::sync::atomic::{AtomicBool, Ordering};
use tally_common::storage::{CompletionStatus, ObjectiveScore, ObjectiveStatus, SuccessStatus};

/// Default lifecycle ordering for scoring sets
pub const SCORING_ORDER: i32 = 500;

/// Scale a value into a rounded percentage of its range
///
/// Non-negative values are a percentage of `max_score` (0 when the range
/// is empty); negative values are a percentage of the negative range
/// magnitude, so a fully negative score scales to -100.
pub fn scale(value: f64, min_score: f64, max_score: f64) -> i64 {
    if value >= 0.0 {
        if max_score == 0.0 {
            return 0;
        }
        (100.0 * value / max_score).round() as i64
    } else {
        let floor = min_score.min(0.0).abs();
        if floor == 0.0 {
            return 0;
        }
        (100.0 * value / floor).round() as i64
    }
}

/// Per-set scoring configuration flags
#[derive(Debug, Clone)]
pub struct ScoringOptions {
    /// Count this set's score into the total
    pub is_score_included: bool,
    /// Require this set's completion for total completion
    pub is_completion_required: bool,
    /// Whether this set supports being reset for another attempt
    pub can_reset: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            is_score_included: true,
            is_completion_required: true,
            can_reset: false,
        }
    }
}

/// Own data of a scoring set on top of [`SetCore`]
pub struct ScoringCore {
    core: SetCore,
    options: ScoringOptions,
    objective: Objective,
    was_complete: AtomicBool,
    was_passed: AtomicBool,
}

impl ScoringCore {
    pub fn new(core: SetCore, options: ScoringOptions) -> Self {
        let objective = Objective::new(core.ctx().storage(), core.id());
        Self {
            core,
            options,
            objective,
            was_complete: AtomicBool::new(false),
            was_passed: AtomicBool::new(false),
        }
    }

    pub fn core(&self) -> &SetCore {
        &self.core
    }

    pub fn options(&self) -> &ScoringOptions {
        &self.options
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    fn swap_was_complete(&self, value: bool) -> bool {
        self.was_complete.swap(value, Ordering::SeqCst)
    }

    fn swap_was_passed(&self, value: bool) -> bool {
        self.was_passed.swap(value, Ordering::SeqCst)
    }
}

/// Sets that roll score and correctness up from their questions
pub trait ScoredSet: LifecycleSet {
    /// The scoring own data
    fn scoring(&self) -> &ScoringCore;

    /// Sum of minimum scores over available questions
    fn min_score(&self) -> f64 {
        self.sum_questions(|n| n.min_score)
    }

    /// Sum of maximum scores over available questions
    fn max_score(&self) -> f64 {
        self.sum_questions(|n| n.max_score)
    }

    /// Sum of scores over available questions
    fn score(&self) -> f64 {
        self.sum_questions(|n| n.score)
    }

    /// Count of correctly answered available questions
    fn correctness(&self) -> usize {
        let questions = self.available_questions();
        let tree = self.core().ctx().tree();
        questions
            .iter()
            .filter(|id| {
                tree.find_by_id(id.as_str())
                    .map(|n| n.is_correct)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Number of available questions
    fn max_correctness(&self) -> usize {
        self.available_questions().len()
    }

    /// Score scaled into a rounded percentage
    fn scaled_score(&self) -> i64 {
        scale(self.score(), self.min_score(), self.max_score())
    }

    /// Correctness scaled into a rounded percentage
    fn scaled_correctness(&self) -> i64 {
        scale(self.correctness() as f64, 0.0, self.max_correctness() as f64)
    }

    /// Score rendered with an explicit leading `+` for positive values
    fn score_as_string(&self) -> String {
        let score = self.score();
        let rendered = if score.fract() == 0.0 {
            format!("{}", score as i64)
        } else {
            format!("{score}")
        };
        if score > 0.0 {
            format!("+{rendered}")
        } else {
            rendered
        }
    }

    /// Whether this set's score counts toward the total
    fn is_score_included(&self) -> bool {
        self.is_available() && !self.is_optional() && self.scoring().options().is_score_included
    }

    /// Whether this set's completion is required for the total
    fn is_completion_required(&self) -> bool {
        self.is_available()
            && !self.is_optional()
            && self.scoring().options().is_completion_required
    }

    #[doc(hidden)]
    fn sum_questions(&self, field: fn(&tally_common::model::ContentNode) -> f64) -> f64 {
        let questions = self.available_questions();
        let tree = self.core().ctx().tree();
        questions
            .iter()
            .filter_map(|id| tree.find_by_id(id.as_str()).map(field))
            .sum()
    }
}

/// Edges detected by an update pass
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateTransitions {
    /// The set just became complete
    pub completed: bool,
    /// The set just became passed
    pub passed: bool,
}

/// Detect completion and pass edges, firing events and objective writes
///
/// Call from a scoring set's `on_update`. Intersected clones are inert:
/// no events, no objective writes, no edge bookkeeping.
pub fn process_update(set: &dyn ScoredSet) -> UpdateTransitions {
    if set.is_intersected() {
        return UpdateTransitions::default();
    }
    let is_complete = set.is_complete();
    let is_passed = set.is_passed();
    let scoring = set.scoring();
    let was_complete = scoring.swap_was_complete(is_complete);
    let was_passed = scoring.swap_was_passed(is_passed);
    let transitions = UpdateTransitions {
        completed: is_complete && !was_complete,
        passed: is_passed && !was_passed,
    };
    if transitions.completed {
        set.core().emit_completed(is_passed);
        let objective = scoring.objective();
        objective.set_description(set.title());
        objective.set_score(ObjectiveScore {
            score: set.score(),
            min_score: set.min_score(),
            max_score: set.max_score(),
        });
        objective.set_status(ObjectiveStatus {
            completion: CompletionStatus::Completed,
            success: Some(if is_passed {
                SuccessStatus::Passed
            } else {
                SuccessStatus::Failed
            }),
        });
    }
    if transitions.passed {
        set.core().emit_passed();
    }
    transitions
}
