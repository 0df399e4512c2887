//! Content-model port
//!
//! The engine layers on top of an externally-owned tree of content models
//! (course → menu/page → article → block → component). This module defines
//! the consumed surface: node data, the tree with its lookup capabilities,
//! and the attribute change stream the lifecycle controller subscribes to.

mod change;
mod node;
mod tree;

pub use change::{ContentEvent, ModelAttr};
pub use node::{ComponentInfo, ContentNode, ModelKind};
pub use tree::ContentTree;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique content-model identifier
///
/// Ids are host-authored strings (`"a-300"`, `"c-15"`); the newtype keeps
/// them from mixing with set ids and other string keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ModelId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
