//! Content-model change stream types

use super::ModelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable content-model attributes observable through the change stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelAttr {
    Available,
    Complete,
    InteractionComplete,
    Active,
    Visited,
    Correct,
    Optional,
    Score,
    Attached,
}

impl ModelAttr {
    /// Attribute name as the host content schema spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAttr::Available => "isAvailable",
            ModelAttr::Complete => "isComplete",
            ModelAttr::InteractionComplete => "isInteractionComplete",
            ModelAttr::Active => "isActive",
            ModelAttr::Visited => "isVisited",
            ModelAttr::Correct => "isCorrect",
            ModelAttr::Optional => "isOptional",
            ModelAttr::Score => "score",
            ModelAttr::Attached => "isAttached",
        }
    }
}

/// Events emitted by the content tree as models are added, removed,
/// mutated, or reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContentEvent {
    /// A model was inserted into the tree
    Added {
        id: ModelId,
        timestamp: DateTime<Utc>,
    },
    /// A model (and its subtree) was removed from the tree
    Removed {
        id: ModelId,
        timestamp: DateTime<Utc>,
    },
    /// A mutable attribute changed value
    Changed {
        id: ModelId,
        attr: ModelAttr,
        timestamp: DateTime<Utc>,
    },
    /// A model's interaction state was reset by the host
    ModelReset {
        id: ModelId,
        timestamp: DateTime<Utc>,
    },
}

impl ContentEvent {
    /// The model this event concerns
    pub fn model_id(&self) -> &ModelId {
        match self {
            ContentEvent::Added { id, .. }
            | ContentEvent::Removed { id, .. }
            | ContentEvent::Changed { id, .. }
            | ContentEvent::ModelReset { id, .. } => id,
        }
    }
}
