use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Kinds of domain entity a canvas (or a duplicate record) can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Canvas,
    Document,
    Resource,
    CodeArtifact,
    SkillResponse,
    DriveFile,
    WorkflowApp,
}

impl EntityType {
    /// Wire / database name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::Document => "document",
            Self::Resource => "resource",
            Self::CodeArtifact => "codeArtifact",
            Self::SkillResponse => "skillResponse",
            Self::DriveFile => "driveFile",
            Self::WorkflowApp => "workflowApp",
        }
    }

    /// Parse the database name back into the enum.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "canvas" => Some(Self::Canvas),
            "document" => Some(Self::Document),
            "resource" => Some(Self::Resource),
            "codeArtifact" => Some(Self::CodeArtifact),
            "skillResponse" => Some(Self::SkillResponse),
            "driveFile" => Some(Self::DriveFile),
            "workflowApp" => Some(Self::WorkflowApp),
            _ => None,
        }
    }

    /// Library entities are the kinds counted against a user's storage quota.
    pub fn is_library_entity(self) -> bool {
        matches!(self, Self::Document | Self::Resource | Self::CodeArtifact)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor returned by every operation that creates an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub entity_id: String,
    pub entity_type: EntityType,
}

impl Entity {
    pub fn new(entity_id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
        }
    }
}
