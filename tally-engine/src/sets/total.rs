//! The total set
//!
//! A singleton scoring set anchored at the course, summing across every
//! registered scoring set and gating course pass/fail on the configured
//! passmark.

use super::hierarchy::unique_models;
use super::scoring::{process_update, ScoredSet, ScoringCore, ScoringOptions, SCORING_ORDER};
use super::{ContentSet, LifecycleSet, SetConfig, SetCore, SetHandle};
use crate::context::ScoringContext;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tally_common::config::{Passmark, ScoringConfig};
use tally_common::events::ScoringEvent;
use tally_common::model::ModelId;
use tally_common::time;
use tally_common::Result;

/// The course-wide total scoring set
pub struct TotalSet {
    scoring: ScoringCore,
    passmark: Passmark,
    weak: Weak<TotalSet>,
}

impl TotalSet {
    /// Set type (and default id) of the total set
    pub const TYPE: &'static str = "total";

    /// Build the total set from the course configuration and register it
    pub fn create(ctx: &ScoringContext, config: &ScoringConfig) -> Result<Arc<TotalSet>> {
        let course_id = ctx.tree().course().map(|c| c.id.clone());
        let core = SetCore::new(
            ctx.clone(),
            SetConfig {
                id: Some(config.id.clone().unwrap_or_else(|| Self::TYPE.to_string())),
                set_type: Some(Self::TYPE.to_string()),
                title: config.title.clone(),
                model_id: course_id,
                order: Some(SCORING_ORDER),
                ..Default::default()
            },
        );
        let scoring = ScoringCore::new(
            core,
            // The total never feeds itself
            ScoringOptions {
                is_score_included: false,
                is_completion_required: false,
                can_reset: false,
            },
        );
        let passmark = config.passmark.clone();
        let set = Arc::new_cyclic(|weak| TotalSet {
            scoring,
            passmark,
            weak: weak.clone(),
        });
        if let Some(registry) = ctx.registry() {
            registry.register(set.clone())?;
        }
        Ok(set)
    }

    /// The configured passmark
    pub fn passmark(&self) -> &Passmark {
        &self.passmark
    }

    fn handle(&self) -> Option<SetHandle> {
        self.weak.upgrade().map(|set| set as SetHandle)
    }

    /// Registered scoring sets counting toward the total, before any
    /// clone re-intersection
    fn included_roots(&self, completion: bool) -> Vec<SetHandle> {
        let Some(registry) = self.core().ctx().registry() else {
            return Vec::new();
        };
        registry
            .all()
            .into_iter()
            .filter(|set| set.id() != self.id())
            .filter(|set| {
                set.as_scoring()
                    .map(|scored| {
                        if completion {
                            scored.is_completion_required()
                        } else {
                            scored.is_score_included()
                        }
                    })
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Member sets, re-intersected against this instance when it is an
    /// intersected clone so sums respect the parent chain
    fn member_sets(&self, completion: bool) -> Vec<SetHandle> {
        let members = self.included_roots(completion);
        if !self.is_intersected() {
            return members;
        }
        let Some(handle) = self.handle() else {
            return members;
        };
        members
            .into_iter()
            .map(|set| set.clone_with_parent(handle.clone()))
            .filter(|subset| !subset.effective_models().is_empty())
            .collect()
    }

    /// Sets whose scores are summed
    pub fn scoring_sets(&self) -> Vec<SetHandle> {
        self.member_sets(false)
    }

    /// Sets whose completion gates total completion
    pub fn completion_sets(&self) -> Vec<SetHandle> {
        self.member_sets(true)
    }

    fn sum_scoring(&self, field: fn(&dyn ScoredSet) -> f64) -> f64 {
        self.scoring_sets()
            .iter()
            .filter_map(|set| set.as_scoring().map(field))
            .sum()
    }
}

impl ContentSet for TotalSet {
    fn core(&self) -> &SetCore {
        self.scoring.core()
    }

    fn clone_with_parent(&self, parent: SetHandle) -> SetHandle {
        let core = self.scoring.core().with_parent(parent);
        let options = self.scoring.options().clone();
        let passmark = self.passmark.clone();
        Arc::new_cyclic(|weak| TotalSet {
            scoring: ScoringCore::new(core, options),
            passmark,
            weak: weak.clone(),
        })
    }

    /// Union of every member set's models, de-duplicated
    fn models(&self) -> Vec<ModelId> {
        let mut out = Vec::new();
        for set in self.included_roots(false) {
            out.extend(set.models());
        }
        for set in self.included_roots(true) {
            out.extend(set.models());
        }
        unique_models(out)
    }

    /// Complete when every completion-required set is complete
    fn is_complete(&self) -> bool {
        self.completion_sets().iter().all(|set| set.is_complete())
    }

    /// Passed when the passmark thresholds are met
    ///
    /// With the passmark disabled there is nothing to judge; pass mirrors
    /// completion so downstream status stays coherent.
    fn is_passed(&self) -> bool {
        if !self.passmark.is_enabled {
            return self.is_complete();
        }
        let (score, correctness) = if self.passmark.is_scaled {
            (self.scaled_score() as f64, self.scaled_correctness() as f64)
        } else {
            (self.score(), self.correctness() as f64)
        };
        if score < self.passmark.score || correctness < self.passmark.correctness {
            return false;
        }
        if self.passmark.requires_passed_subsets {
            return self.scoring_sets().iter().all(|set| set.is_passed());
        }
        true
    }

    /// Failed only once no scoring set can offer another attempt
    fn is_failed(&self) -> bool {
        self.is_complete() && !self.is_passed() && !self.can_reset()
    }

    fn as_scoring(&self) -> Option<&dyn ScoredSet> {
        Some(self)
    }
}

#[async_trait]
impl LifecycleSet for TotalSet {
    async fn on_update(&self) {
        let transitions = process_update(self);
        if self.is_intersected() {
            return;
        }
        if transitions.completed {
            self.core().ctx().bus().emit_lossy(ScoringEvent::Completed {
                passed: self.is_passed(),
                timestamp: time::now(),
            });
        }
        if transitions.passed {
            self.core().ctx().bus().emit_lossy(ScoringEvent::Passed {
                timestamp: time::now(),
            });
        }
    }

    fn can_reset(&self) -> bool {
        self.scoring_sets().iter().any(|set| set.can_reset())
    }
}

impl ScoredSet for TotalSet {
    fn scoring(&self) -> &ScoringCore {
        &self.scoring
    }

    /// Sum of member minimum scores
    fn min_score(&self) -> f64 {
        self.sum_scoring(|set| set.min_score())
    }

    /// Sum of member maximum scores
    fn max_score(&self) -> f64 {
        self.sum_scoring(|set| set.max_score())
    }

    /// Sum of member scores
    fn score(&self) -> f64 {
        self.sum_scoring(|set| set.score())
    }

    /// Sum of member correctness counts
    fn correctness(&self) -> usize {
        self.scoring_sets()
            .iter()
            .filter_map(|set| set.as_scoring().map(|scored| scored.correctness()))
            .sum()
    }

    /// Sum of member question counts
    fn max_correctness(&self) -> usize {
        self.scoring_sets()
            .iter()
            .filter_map(|set| set.as_scoring().map(|scored| scored.max_correctness()))
            .sum()
    }
}
