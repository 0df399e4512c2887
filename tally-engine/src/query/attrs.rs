//! Closed attribute match-rule table
//!
//! Every attribute the query language recognises is registered here with
//! its matching kind: callable attributes are invoked with the queried
//! value, value attributes compare by truthiness (no value given) or
//! string equality. Unrecognised attributes never match.

use crate::sets::{ContentSet, SetHandle};
use tally_common::model::ContentNode;
use tracing::warn;

/// A value read from a set for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bool(bool),
    Text(String),
    Missing,
}

impl AttrValue {
    /// JavaScript-style truthiness: false, empty, and missing are falsy
    pub fn truthy(&self) -> bool {
        match self {
            AttrValue::Bool(b) => *b,
            AttrValue::Text(s) => !s.is_empty(),
            AttrValue::Missing => false,
        }
    }

    /// Render for string-equality comparison
    pub fn render(&self) -> String {
        match self {
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Text(s) => s.clone(),
            AttrValue::Missing => String::new(),
        }
    }
}

/// How an attribute matches
pub enum AttrKind {
    /// Called with the queried value; truthy result is a match
    Callable(fn(&SetHandle, Option<&str>) -> bool),
    /// Read a value, then truthiness (no value) or string equality
    Value(fn(&SetHandle) -> AttrValue),
}

fn with_anchor<R>(set: &SetHandle, read: impl FnOnce(&ContentNode) -> R) -> Option<R> {
    let core = set.core();
    let model_id = core.model_id()?.clone();
    let ctx = core.ctx();
    let tree = ctx.tree();
    tree.find_by_id(model_id.as_str()).map(read)
}

/// Look up the match rule for an attribute name
pub fn rule_for(key: &str) -> Option<AttrKind> {
    Some(match key {
        "id" => AttrKind::Value(|set| AttrValue::Text(set.id().to_string())),
        "type" => AttrKind::Value(|set| AttrValue::Text(set.set_type().to_string())),
        "modelId" => AttrKind::Value(|set| {
            set.model_id()
                .map(|id| AttrValue::Text(id.to_string()))
                .unwrap_or(AttrValue::Missing)
        }),
        "isEnabled" => AttrKind::Value(|set| AttrValue::Bool(set.is_enabled())),
        "isOptional" => AttrKind::Value(|set| AttrValue::Bool(set.is_optional())),
        "isAvailable" => AttrKind::Value(|set| AttrValue::Bool(set.is_available())),
        "isModelAvailableInHierarchy" => {
            AttrKind::Value(|set| AttrValue::Bool(set.is_model_available_in_hierarchy()))
        }
        "isPopulated" => AttrKind::Value(|set| AttrValue::Bool(set.is_populated())),
        "isNotPopulated" => AttrKind::Value(|set| AttrValue::Bool(set.is_not_populated())),
        "isComplete" => AttrKind::Value(|set| AttrValue::Bool(set.is_complete())),
        "isIncomplete" => AttrKind::Value(|set| AttrValue::Bool(!set.is_complete())),
        "isPassed" => AttrKind::Value(|set| AttrValue::Bool(set.is_passed())),
        "isFailed" => AttrKind::Value(|set| AttrValue::Bool(set.is_failed())),
        "modelType" => AttrKind::Value(|set| {
            with_anchor(set, |node| AttrValue::Text(node.kind.as_str().to_string()))
                .unwrap_or(AttrValue::Missing)
        }),
        "modelComponent" => AttrKind::Value(|set| {
            with_anchor(set, |node| {
                node.component
                    .as_ref()
                    .map(|c| AttrValue::Text(c.component.clone()))
                    .unwrap_or(AttrValue::Missing)
            })
            .unwrap_or(AttrValue::Missing)
        }),
        "modelTypeGroup" => AttrKind::Callable(|set, value| {
            let Some(group) = value else {
                return false;
            };
            with_anchor(set, |node| node.is_type_group(group)).unwrap_or(false)
        }),
        _ => return None,
    })
}

/// Match one attribute against a set
pub fn match_attr(set: &SetHandle, key: &str, value: Option<&str>) -> bool {
    match rule_for(key) {
        None => {
            warn!(attr = key, "unrecognised query attribute never matches");
            false
        }
        Some(AttrKind::Callable(call)) => call(set, value),
        Some(AttrKind::Value(read)) => {
            let actual = read(set);
            match value {
                None => actual.truthy(),
                Some(expected) => actual.render() == expected,
            }
        }
    }
}
