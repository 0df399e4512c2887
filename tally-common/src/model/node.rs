//! Content-model node data

use super::ModelId;
use serde::{Deserialize, Serialize};

/// Structural kind of a content model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Course,
    Menu,
    Page,
    Article,
    Block,
    Component,
}

impl ModelKind {
    /// Kind name as the host content schema spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Course => "course",
            ModelKind::Menu => "menu",
            ModelKind::Page => "page",
            ModelKind::Article => "article",
            ModelKind::Block => "block",
            ModelKind::Component => "component",
        }
    }

    /// Content objects are the navigation targets: course, menu, page
    pub fn is_content_object(&self) -> bool {
        matches!(self, ModelKind::Course | ModelKind::Menu | ModelKind::Page)
    }
}

/// Component sub-type information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component name, e.g. "mcq", "text", "slider"
    pub component: String,
    /// Whether this component is a question (carries score and correctness)
    pub is_question_type: bool,
}

/// A single content model
///
/// Nodes keep parent/child links by id; the owning [`ContentTree`] resolves
/// them. Detached nodes (`is_attached == false`) stay addressable so sets
/// that allow detached models can still enumerate them.
///
/// [`ContentTree`]: super::ContentTree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: ModelId,
    pub kind: ModelKind,
    pub component: Option<ComponentInfo>,
    pub title: String,
    pub parent: Option<ModelId>,
    pub children: Vec<ModelId>,
    pub is_attached: bool,
    pub is_available: bool,
    pub is_complete: bool,
    pub is_interaction_complete: bool,
    pub is_active: bool,
    pub is_visited: bool,
    pub is_correct: bool,
    pub is_optional: bool,
    pub is_trackable: bool,
    pub score: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Opaque relocation key for state restoration across sessions
    pub tracking_position: Option<String>,
}

impl ContentNode {
    /// Create a node with the defaults a freshly-authored model carries:
    /// attached, available, trackable, everything else unset.
    pub fn new(id: impl Into<ModelId>, kind: ModelKind) -> Self {
        Self {
            id: id.into(),
            kind,
            component: None,
            title: String::new(),
            parent: None,
            children: Vec::new(),
            is_attached: true,
            is_available: true,
            is_complete: false,
            is_interaction_complete: false,
            is_active: false,
            is_visited: false,
            is_correct: false,
            is_optional: false,
            is_trackable: true,
            score: 0.0,
            min_score: 0.0,
            max_score: 0.0,
            tracking_position: None,
        }
    }

    /// Create a component node with the given sub-type
    pub fn component(
        id: impl Into<ModelId>,
        component: impl Into<String>,
        is_question_type: bool,
    ) -> Self {
        let mut node = Self::new(id, ModelKind::Component);
        node.component = Some(ComponentInfo {
            component: component.into(),
            is_question_type,
        });
        node
    }

    /// Set the title (builder style)
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the score range (builder style)
    pub fn with_score_range(mut self, min_score: f64, max_score: f64) -> Self {
        self.min_score = min_score;
        self.max_score = max_score;
        self
    }

    /// Whether this node is a question component
    pub fn is_question(&self) -> bool {
        self.component
            .as_ref()
            .map(|c| c.is_question_type)
            .unwrap_or(false)
    }

    /// Type-group membership predicate
    ///
    /// Groups are the kind names plus `contentobject`, `question`,
    /// `presentation`, and `trackable`.
    pub fn is_type_group(&self, group: &str) -> bool {
        match group {
            "contentobject" => self.kind.is_content_object(),
            "question" => self.is_question(),
            "presentation" => self.kind == ModelKind::Component && !self.is_question(),
            "trackable" => self.is_trackable,
            other => self.kind.as_str() == other,
        }
    }
}
