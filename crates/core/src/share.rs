//! Share ID scheme.
//!
//! A share ID is `<type prefix><uuid-v7 hex>`; the prefix alone tells which
//! kind of entity a public share points at.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EntityType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShareEntityType {
    Canvas,
    Document,
    Resource,
    CodeArtifact,
    SkillResponse,
    DriveFile,
    WorkflowApp,
    WorkflowAppTemplate,
}

const ALL: [ShareEntityType; 8] = [
    ShareEntityType::Canvas,
    ShareEntityType::Document,
    ShareEntityType::Resource,
    ShareEntityType::CodeArtifact,
    ShareEntityType::SkillResponse,
    ShareEntityType::DriveFile,
    ShareEntityType::WorkflowApp,
    ShareEntityType::WorkflowAppTemplate,
];

impl ShareEntityType {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Canvas => "can-",
            Self::Document => "doc-",
            Self::Resource => "res-",
            Self::CodeArtifact => "cod-",
            Self::SkillResponse => "skr-",
            Self::DriveFile => "dfs-",
            Self::WorkflowApp => "wfa-",
            Self::WorkflowAppTemplate => "wft-",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::Document => "document",
            Self::Resource => "resource",
            Self::CodeArtifact => "codeArtifact",
            Self::SkillResponse => "skillResponse",
            Self::DriveFile => "driveFile",
            Self::WorkflowApp => "workflowApp",
            Self::WorkflowAppTemplate => "workflowAppTemplate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Recover the entity type from a share ID's prefix.
    pub fn from_share_id(share_id: &str) -> Option<Self> {
        ALL.into_iter().find(|t| share_id.starts_with(t.prefix()))
    }

    /// The entity type a share of this kind duplicates into.
    pub fn entity_type(self) -> EntityType {
        match self {
            Self::Canvas => EntityType::Canvas,
            Self::Document => EntityType::Document,
            Self::Resource => EntityType::Resource,
            Self::CodeArtifact => EntityType::CodeArtifact,
            Self::SkillResponse => EntityType::SkillResponse,
            Self::DriveFile => EntityType::DriveFile,
            Self::WorkflowApp | Self::WorkflowAppTemplate => EntityType::WorkflowApp,
        }
    }

    /// Share kind for a node entity type, if nodes of that type are shared.
    pub fn for_entity(entity_type: EntityType) -> Option<Self> {
        match entity_type {
            EntityType::Canvas => Some(Self::Canvas),
            EntityType::Document => Some(Self::Document),
            EntityType::Resource => Some(Self::Resource),
            EntityType::CodeArtifact => Some(Self::CodeArtifact),
            EntityType::SkillResponse => Some(Self::SkillResponse),
            EntityType::DriveFile => Some(Self::DriveFile),
            EntityType::WorkflowApp => Some(Self::WorkflowApp),
        }
    }
}

impl std::fmt::Display for ShareEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn gen_share_id(entity_type: ShareEntityType) -> String {
    format!("{}{}", entity_type.prefix(), Uuid::now_v7().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_unique_and_recoverable() {
        for ty in ALL {
            let id = gen_share_id(ty);
            assert_eq!(ShareEntityType::from_share_id(&id), Some(ty));
        }
        let prefixes: std::collections::HashSet<_> = ALL.iter().map(|t| t.prefix()).collect();
        assert_eq!(prefixes.len(), ALL.len());
    }

    #[test]
    fn canvas_shares_start_with_c() {
        assert!(gen_share_id(ShareEntityType::Canvas).starts_with('c'));
    }

    #[test]
    fn names_round_trip() {
        for ty in ALL {
            assert_eq!(ShareEntityType::from_name(ty.as_str()), Some(ty));
        }
    }

    #[test]
    fn unknown_prefix_is_none() {
        assert_eq!(ShareEntityType::from_share_id("zzz-123"), None);
    }
}
