//! Set algebra
//!
//! A *set* is a named projection over content models. Root sets live in
//! the registry and participate in the lifecycle; intersected clones are
//! short-lived query artifacts carrying an `intersection_parent` chain.

pub mod core;
pub mod hierarchy;
pub mod lifecycle;
pub mod model_set;
pub mod scoring;
pub mod total;

pub use self::core::{ContentSet, SetConfig, SetCore};
pub use self::lifecycle::LifecycleSet;
pub use self::model_set::ModelSet;
pub use self::scoring::{scale, ScoredSet, ScoringCore, ScoringOptions};
pub use self::total::TotalSet;

use std::sync::Arc;

/// Shared handle to any set
pub type SetHandle = Arc<dyn LifecycleSet>;

/// Fold a chain of sets left-to-right via intersection
///
/// `intersect([a, b, c])` yields a clone of `c` whose intersection parent
/// is `b` intersected with `a`; the concrete type of the result is the
/// rightmost operand's.
pub fn intersect(sets: &[SetHandle]) -> Option<SetHandle> {
    let mut iter = sets.iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |parent, set| set.clone_with_parent(parent)))
}

/// The intersection chain from the root ancestor to this set, inclusive
pub fn subset_path(set: &SetHandle) -> Vec<SetHandle> {
    let mut path = vec![set.clone()];
    let mut current = set.clone();
    while let Some(parent) = current.intersection_parent() {
        path.push(parent.clone());
        current = parent;
    }
    path.reverse();
    path
}

/// Clones of every other registered set, intersected with this set
pub fn intersected_subsets(set: &SetHandle) -> Vec<SetHandle> {
    let Some(registry) = set.core().ctx().registry() else {
        return Vec::new();
    };
    registry
        .all()
        .into_iter()
        .filter(|other| other.id() != set.id())
        .map(|other| other.clone_with_parent(set.clone()))
        .collect()
}

/// Intersected subsets whose effective models are non-empty
pub fn populated_intersected_subsets(set: &SetHandle) -> Vec<SetHandle> {
    intersected_subsets(set)
        .into_iter()
        .filter(|subset| subset.is_populated())
        .collect()
}

/// This-intersected clone of the registered set with the given id
pub fn subset_by_id(set: &SetHandle, id: &str) -> Option<SetHandle> {
    if id == set.id() {
        return None;
    }
    let registry = set.core().ctx().registry()?;
    registry
        .get(id)
        .map(|other| other.clone_with_parent(set.clone()))
}

/// This-intersected clones of the registered sets of the given type
pub fn subsets_by_type(set: &SetHandle, set_type: &str) -> Vec<SetHandle> {
    let Some(registry) = set.core().ctx().registry() else {
        return Vec::new();
    };
    registry
        .by_type(set_type)
        .into_iter()
        .filter(|other| other.id() != set.id())
        .map(|other| other.clone_with_parent(set.clone()))
        .collect()
}

/// This-intersected clones of the registered sets whose models intersect
/// the given model's hierarchy
pub fn subsets_by_intersecting_model_id(set: &SetHandle, model_id: &str) -> Vec<SetHandle> {
    let Some(registry) = set.core().ctx().registry() else {
        return Vec::new();
    };
    registry
        .by_intersecting_model_id(model_id)
        .into_iter()
        .filter(|other| other.id() != set.id())
        .map(|other| other.clone_with_parent(set.clone()))
        .collect()
}
