//! Content tree: node storage, hierarchy lookups, change stream

use super::{ContentEvent, ContentNode, ModelAttr, ModelId, ModelKind};
use crate::{Error, Result};
use tokio::sync::broadcast;
use tracing::debug;

/// The content-model tree
///
/// Owns every node (attached and detached) indexed by id, plus a broadcast
/// channel carrying [`ContentEvent`]s for each structural or attribute
/// change. The lifecycle controller drives set scheduling from that stream.
pub struct ContentTree {
    nodes: std::collections::HashMap<ModelId, ContentNode>,
    root: Option<ModelId>,
    change_tx: broadcast::Sender<ContentEvent>,
}

impl ContentTree {
    /// Create an empty tree
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(256);
        Self {
            nodes: std::collections::HashMap::new(),
            root: None,
            change_tx,
        }
    }

    /// Subscribe to the change stream
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ContentEvent> {
        self.change_tx.subscribe()
    }

    /// The course node, if one has been added
    pub fn course(&self) -> Option<&ContentNode> {
        self.root.as_ref().and_then(|id| self.nodes.get(id))
    }

    /// Number of nodes (attached and detached)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in insertion-independent (arbitrary) order
    pub fn ids(&self) -> impl Iterator<Item = &ModelId> {
        self.nodes.keys()
    }

    /// Find a node by id
    pub fn find_by_id(&self, id: &str) -> Option<&ContentNode> {
        self.nodes.get(id)
    }

    /// Find a node by its tracking position
    pub fn find_by_tracking_position(&self, position: &str) -> Option<&ContentNode> {
        self.nodes
            .values()
            .find(|n| n.tracking_position.as_deref() == Some(position))
    }

    /// Insert a node, linking it under its parent
    ///
    /// The first `Course` node becomes the root. Emits `Added`.
    pub fn add_node(&mut self, node: ContentNode) -> Result<()> {
        let id = node.id.clone();
        if self.nodes.contains_key(id.as_str()) {
            return Err(Error::Internal(format!("model {id} already in tree")));
        }
        if node.kind == ModelKind::Course && self.root.is_none() {
            self.root = Some(id.clone());
        }
        if let Some(parent_id) = node.parent.clone() {
            let parent = self
                .nodes
                .get_mut(parent_id.as_str())
                .ok_or_else(|| Error::UnknownModel {
                    id: parent_id.to_string(),
                })?;
            if !parent.children.contains(&id) {
                parent.children.push(id.clone());
            }
        }
        self.nodes.insert(id.clone(), node);
        let _ = self.change_tx.send(ContentEvent::Added {
            id,
            timestamp: crate::time::now(),
        });
        Ok(())
    }

    /// Remove a node and its whole subtree
    ///
    /// Emits `Removed` for every node taken out, leaves first.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(Error::UnknownModel { id: id.to_string() });
        }
        let mut doomed = self.descendants(id);
        doomed.reverse();
        doomed.push(ModelId::from(id));
        for victim in doomed {
            if let Some(node) = self.nodes.remove(victim.as_str()) {
                if let Some(parent_id) = node.parent {
                    if let Some(parent) = self.nodes.get_mut(parent_id.as_str()) {
                        parent.children.retain(|c| c != &victim);
                    }
                }
                if self.root.as_ref() == Some(&victim) {
                    self.root = None;
                }
                let _ = self.change_tx.send(ContentEvent::Removed {
                    id: victim,
                    timestamp: crate::time::now(),
                });
            }
        }
        Ok(())
    }

    /// Ancestors of a node, nearest first, course last
    pub fn ancestors(&self, id: &str, include_self: bool) -> Vec<ModelId> {
        let mut out = Vec::new();
        let Some(node) = self.nodes.get(id) else {
            return out;
        };
        if include_self {
            out.push(node.id.clone());
        }
        let mut current = node.parent.clone();
        while let Some(parent_id) = current {
            match self.nodes.get(parent_id.as_str()) {
                Some(parent) => {
                    out.push(parent.id.clone());
                    current = parent.parent.clone();
                }
                None => break,
            }
        }
        out
    }

    /// Number of ancestors above a node (course depth 0)
    pub fn depth(&self, id: &str) -> usize {
        self.ancestors(id, false).len()
    }

    /// Find the nearest ancestor matching a type group, self excluded
    pub fn find_ancestor(&self, id: &str, group: &str) -> Option<&ContentNode> {
        self.ancestors(id, false).into_iter().find_map(|aid| {
            let node = self.nodes.get(aid.as_str())?;
            node.is_type_group(group).then_some(node)
        })
    }

    /// All descendants of a node, depth-first pre-order, detached included
    pub fn descendants(&self, id: &str) -> Vec<ModelId> {
        let mut out = Vec::new();
        let Some(node) = self.nodes.get(id) else {
            return out;
        };
        let mut stack: Vec<ModelId> = node.children.iter().rev().cloned().collect();
        while let Some(child_id) = stack.pop() {
            if let Some(child) = self.nodes.get(child_id.as_str()) {
                out.push(child.id.clone());
                stack.extend(child.children.iter().rev().cloned());
            }
        }
        out
    }

    /// Attached children of a node, in authored order
    pub fn children(&self, id: &str) -> Vec<ModelId> {
        self.all_children(id)
            .into_iter()
            .filter(|cid| {
                self.nodes
                    .get(cid.as_str())
                    .map(|c| c.is_attached)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// All children of a node including detached, in authored order
    pub fn all_children(&self, id: &str) -> Vec<ModelId> {
        self.nodes
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Set a boolean attribute, emitting `Changed` when the value moves
    pub fn set_flag(&mut self, id: &str, attr: ModelAttr, value: bool) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::UnknownModel { id: id.to_string() })?;
        let slot = match attr {
            ModelAttr::Available => &mut node.is_available,
            ModelAttr::Complete => &mut node.is_complete,
            ModelAttr::InteractionComplete => &mut node.is_interaction_complete,
            ModelAttr::Active => &mut node.is_active,
            ModelAttr::Visited => &mut node.is_visited,
            ModelAttr::Correct => &mut node.is_correct,
            ModelAttr::Optional => &mut node.is_optional,
            ModelAttr::Attached => &mut node.is_attached,
            ModelAttr::Score => {
                return Err(Error::Internal("score is not a flag".to_string()));
            }
        };
        if *slot == value {
            return Ok(());
        }
        *slot = value;
        debug!(model = id, attr = attr.as_str(), value, "model flag changed");
        let _ = self.change_tx.send(ContentEvent::Changed {
            id: node.id.clone(),
            attr,
            timestamp: crate::time::now(),
        });
        Ok(())
    }

    /// Set a question's score, emitting `Changed`
    pub fn set_score(&mut self, id: &str, score: f64) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::UnknownModel { id: id.to_string() })?;
        if node.score == score {
            return Ok(());
        }
        node.score = score;
        let _ = self.change_tx.send(ContentEvent::Changed {
            id: node.id.clone(),
            attr: ModelAttr::Score,
            timestamp: crate::time::now(),
        });
        Ok(())
    }

    /// Reset a model's interaction state and emit `ModelReset`
    ///
    /// Clears completion, interaction completion, correctness, visited and
    /// score. Availability and structure are untouched.
    pub fn reset_model(&mut self, id: &str) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::UnknownModel { id: id.to_string() })?;
        node.is_complete = false;
        node.is_interaction_complete = false;
        node.is_correct = false;
        node.is_visited = false;
        node.score = 0.0;
        let _ = self.change_tx.send(ContentEvent::ModelReset {
            id: node.id.clone(),
            timestamp: crate::time::now(),
        });
        Ok(())
    }
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}
