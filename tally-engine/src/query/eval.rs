//! Query evaluator
//!
//! Selection, Cartesian multiplication, intersection folding, and the
//! retained-filter pass. Column order matters: the result of a tuple is
//! an instance of the rightmost column's concrete set type.

use super::attrs::match_attr;
use super::parser::{parse, Primary, QueryAttr, SelectionQuery};
use crate::sets::{intersect, subset_path, ContentSet, SetHandle};
use std::collections::HashSet;
use std::sync::Arc;
use tally_common::Result;

/// A where-object: attribute assignments collapsed in declaration order
type WhereObject = Vec<(String, Option<String>)>;

fn assign(target: &mut WhereObject, attr: &QueryAttr) {
    target.retain(|(key, _)| key != &attr.key);
    target.push((attr.key.clone(), attr.value.clone()));
}

/// Expand a column into its where-objects
///
/// The primary seeds one where-object; every `[...]` clause multiplies
/// the list by its attributes. An empty clause multiplies by zero and
/// empties the selection.
fn where_objects(column: &SelectionQuery) -> Vec<WhereObject> {
    let mut seed = WhereObject::new();
    match &column.primary {
        Some(Primary::Id(id)) => seed.push(("id".to_string(), Some(id.clone()))),
        Some(Primary::Type(set_type)) => {
            seed.push(("type".to_string(), Some(set_type.clone())))
        }
        None => {}
    }
    let mut objects = vec![seed];
    for clause in &column.selects {
        let mut multiplied = Vec::with_capacity(objects.len() * clause.len());
        for attr in clause {
            for object in &objects {
                let mut combined = object.clone();
                assign(&mut combined, attr);
                multiplied.push(combined);
            }
        }
        objects = multiplied;
    }
    objects
}

fn matches_where(set: &SetHandle, object: &WhereObject) -> bool {
    object
        .iter()
        .all(|(key, value)| match_attr(set, key, value.as_deref()))
}

fn matches_filters(set: &SetHandle, filters: &[QueryAttr]) -> bool {
    filters
        .iter()
        .all(|attr| match_attr(set, &attr.key, attr.value.as_deref()))
}

/// Select the sets a column contributes, in where-object order
fn select_column(sets: &[SetHandle], column: &SelectionQuery) -> Vec<SetHandle> {
    let mut selected: Vec<SetHandle> = Vec::new();
    for object in where_objects(column) {
        for set in sets {
            if matches_where(set, &object)
                && !selected.iter().any(|s| Arc::ptr_eq(s, set))
            {
                selected.push(set.clone());
            }
        }
    }
    selected
}

fn dedup_key(set: &SetHandle) -> String {
    subset_path(set)
        .iter()
        .map(|s| s.id())
        .collect::<Vec<_>>()
        .join("\u{1}")
}

/// Evaluate a query against the given root sets
///
/// Single-column results are the root sets themselves; multi-column
/// results are intersected clones of the rightmost column's sets.
pub fn evaluate(sets: &[SetHandle], query: &str) -> Result<Vec<SetHandle>> {
    let columns = parse(query)?;
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let selections: Vec<Vec<SetHandle>> = columns
        .iter()
        .map(|column| select_column(sets, column))
        .collect();
    if selections.iter().any(|selection| selection.is_empty()) {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut indices = vec![0usize; selections.len()];
    'tuples: loop {
        // Fold the current tuple left to right, filtering as we go
        let mut folded: Option<SetHandle> = None;
        let mut dropped = false;
        for (column_index, column) in columns.iter().enumerate() {
            let set = &selections[column_index][indices[column_index]];
            let next = match folded.take() {
                None => set.clone(),
                Some(parent) => intersect(&[parent, set.clone()])
                    .unwrap_or_else(|| set.clone()),
            };
            if !matches_filters(&next, &column.filters) {
                dropped = true;
                break;
            }
            folded = Some(next);
        }
        if !dropped {
            if let Some(set) = folded {
                if seen.insert(dedup_key(&set)) {
                    results.push(set);
                }
            }
        }

        // Odometer over the selection lists
        for position in (0..indices.len()).rev() {
            indices[position] += 1;
            if indices[position] < selections[position].len() {
                continue 'tuples;
            }
            indices[position] = 0;
        }
        break;
    }
    Ok(results)
}

/// Evaluate a query and keep the first result
pub fn subset_by_query(sets: &[SetHandle], query: &str) -> Result<Option<SetHandle>> {
    Ok(evaluate(sets, query)?.into_iter().next())
}

/// Fold a path of set ids through the intersection operator
///
/// Accepts the ids pre-split; `parse_path` handles the `"a.b.c"` form.
/// Any id missing from the given sets yields `None`.
pub fn subset_by_path(sets: &[SetHandle], ids: &[String]) -> Option<SetHandle> {
    if ids.is_empty() {
        return None;
    }
    let mut chain = Vec::with_capacity(ids.len());
    for id in ids {
        let set = sets.iter().find(|s| s.id() == id.as_str())?;
        chain.push(set.clone());
    }
    intersect(&chain)
}
