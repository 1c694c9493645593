//! Canvas graph model: nodes, edges and the serialized canvas state.
//!
//! The node payload is typed for the fields the duplication layer owns and
//! keeps every other key verbatim (`extra`), so a state round-trips through
//! this model without losing data written by other services.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::EntityType;

// ---------------------------------------------------------------------------
// Node type
// ---------------------------------------------------------------------------

/// Kind of a canvas node. Unknown kinds are preserved as [`NodeType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Document,
    Resource,
    CodeArtifact,
    SkillResponse,
    Image,
    Video,
    Audio,
    Memo,
    Start,
    Other(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Document => "document",
            Self::Resource => "resource",
            Self::CodeArtifact => "codeArtifact",
            Self::SkillResponse => "skillResponse",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Memo => "memo",
            Self::Start => "start",
            Self::Other(name) => name,
        }
    }

    /// Entity type backing this node, if its `entityId` refers to a
    /// duplicable domain entity.
    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            Self::Document => Some(EntityType::Document),
            Self::Resource => Some(EntityType::Resource),
            Self::CodeArtifact => Some(EntityType::CodeArtifact),
            Self::SkillResponse => Some(EntityType::SkillResponse),
            _ => None,
        }
    }

    pub fn is_library_entity(&self) -> bool {
        self.entity_type().is_some_and(EntityType::is_library_entity)
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio)
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "document" => Self::Document,
            "resource" => Self::Resource,
            "codeArtifact" => Self::CodeArtifact,
            "skillResponse" => Self::SkillResponse,
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "memo" => Self::Memo,
            "start" => Self::Start,
            _ => Self::Other(value),
        }
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        match value {
            NodeType::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Node payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A toolset selected on a skill node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedToolset {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub toolset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Node metadata. `context_items` and `structured_data` are opaque to this
/// layer and only ever rewritten textually.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_toolsets: Option<Vec<SelectedToolset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub entity_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanvasNode {
    /// Build a node referencing an entity. Mostly used by tests and imports.
    pub fn new(id: impl Into<String>, node_type: NodeType, entity_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            position: Position::default(),
            data: NodeData {
                entity_id: entity_id.into(),
                ..NodeData::default()
            },
            extra: Map::new(),
        }
    }

    /// The entity this node references, if it is a duplicable entity node
    /// with a non-empty `entityId`.
    pub fn entity_ref(&self) -> Option<(EntityType, &str)> {
        let entity_type = self.node_type.entity_type()?;
        if self.data.entity_id.is_empty() {
            return None;
        }
        Some((entity_type, self.data.entity_id.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanvasEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canvas state
// ---------------------------------------------------------------------------

/// The canonical serialized canvas graph kept in object storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
}

impl CanvasState {
    pub fn new(nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>) -> Self {
        Self {
            version: String::new(),
            nodes,
            edges,
        }
    }

    /// Number of nodes counted against storage quota when duplicated.
    pub fn library_node_count(&self) -> i64 {
        self.nodes
            .iter()
            .filter(|n| n.node_type.is_library_entity() && !n.data.entity_id.is_empty())
            .count() as i64
    }

    /// All (type, id) entity references, in node order, without duplicates.
    pub fn entity_refs(&self) -> Vec<(EntityType, String)> {
        let mut seen = std::collections::HashSet::new();
        self.nodes
            .iter()
            .filter_map(CanvasNode::entity_ref)
            .filter(|(_, id)| seen.insert(id.to_string()))
            .map(|(ty, id)| (ty, id.to_string()))
            .collect()
    }

    /// Remove the given nodes and every edge touching them.
    pub fn remove_nodes(&mut self, node_ids: &std::collections::HashSet<String>) {
        if node_ids.is_empty() {
            return;
        }
        self.nodes.retain(|n| !node_ids.contains(&n.id));
        self.edges
            .retain(|e| !node_ids.contains(&e.source) && !node_ids.contains(&e.target));
    }
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Width of a canvas version string (milliseconds since the epoch, zero padded).
const VERSION_WIDTH: usize = 15;

/// Produce the next canvas version.
///
/// Versions are zero-padded millisecond timestamps, so lexical order equals
/// chronological order. The result is always strictly greater than
/// `previous` even when the clock has not advanced.
pub fn next_version(previous: Option<&str>) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let floor = previous
        .and_then(|p| p.parse::<i64>().ok())
        .map(|p| p + 1)
        .unwrap_or(0);
    format!("{:0width$}", now.max(floor), width = VERSION_WIDTH)
}
