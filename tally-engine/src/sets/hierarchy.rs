//! Hierarchy utilities
//!
//! The intersection operator of the set algebra is a hierarchy relation,
//! not set equality: a model intersects a list when it equals, is an
//! ancestor of, or is a descendant of some element of that list.

use std::collections::HashSet;
use tally_common::model::{ContentTree, ModelId};

/// Keep the elements of `a` that overlap the hierarchy spanned by `b`
///
/// `b`'s ids, descendants, and ancestors are indexed once, so the pass is
/// linear in `|a| + |b| + |descendants(b)|` plus the ancestor walks.
/// An empty `b` imposes no restriction and returns `a` unchanged.
pub fn filter_by_intersecting_hierarchy(
    a: &[ModelId],
    b: &[ModelId],
    tree: &ContentTree,
) -> Vec<ModelId> {
    if b.is_empty() {
        return a.to_vec();
    }
    let mut index: HashSet<ModelId> = HashSet::new();
    for id in b {
        index.insert(id.clone());
        index.extend(tree.descendants(id.as_str()));
        index.extend(tree.ancestors(id.as_str(), false));
    }
    a.iter().filter(|id| index.contains(id.as_str())).cloned().collect()
}

/// Whether two model lists overlap under the hierarchy relation
pub fn intersects_hierarchy(a: &[ModelId], b: &[ModelId], tree: &ContentTree) -> bool {
    !a.is_empty() && !b.is_empty() && !filter_by_intersecting_hierarchy(a, b, tree).is_empty()
}

/// Whether a model is attached and available through its whole ancestry
///
/// Detached models are excluded regardless of their availability flags.
pub fn is_available_in_hierarchy(tree: &ContentTree, id: &str) -> bool {
    let chain = tree.ancestors(id, true);
    if chain.is_empty() {
        return false;
    }
    chain.iter().all(|aid| {
        tree.find_by_id(aid.as_str())
            .map(|node| node.is_attached && node.is_available)
            .unwrap_or(false)
    })
}

/// De-duplicate a model list, preserving first-seen order
pub fn unique_models(models: Vec<ModelId>) -> Vec<ModelId> {
    let mut seen: HashSet<ModelId> = HashSet::with_capacity(models.len());
    models.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
