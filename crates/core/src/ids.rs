//! Type-prefixed identifier generation.
//!
//! Every entity ID is `<prefix><uuid-v7 simple hex>`. The prefix makes IDs of
//! different kinds visually distinct and keeps textual ID substitution from
//! ever matching unrelated strings.

use uuid::Uuid;

use crate::types::EntityType;

pub const CANVAS_PREFIX: &str = "c-";
pub const DOCUMENT_PREFIX: &str = "d-";
pub const RESOURCE_PREFIX: &str = "r-";
pub const CODE_ARTIFACT_PREFIX: &str = "ca-";
pub const ACTION_RESULT_PREFIX: &str = "ar-";
pub const DRIVE_FILE_PREFIX: &str = "df-";
pub const TOOLSET_PREFIX: &str = "ts-";
pub const MESSAGE_PREFIX: &str = "m-";
pub const DUPLICATE_RECORD_PREFIX: &str = "dr-";
pub const WORKFLOW_APP_PREFIX: &str = "wa-";
pub const TOOL_CALL_PREFIX: &str = "tc-";

fn gen(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::now_v7().simple())
}

pub fn gen_canvas_id() -> String {
    gen(CANVAS_PREFIX)
}

pub fn gen_document_id() -> String {
    gen(DOCUMENT_PREFIX)
}

pub fn gen_resource_id() -> String {
    gen(RESOURCE_PREFIX)
}

pub fn gen_code_artifact_id() -> String {
    gen(CODE_ARTIFACT_PREFIX)
}

pub fn gen_action_result_id() -> String {
    gen(ACTION_RESULT_PREFIX)
}

pub fn gen_drive_file_id() -> String {
    gen(DRIVE_FILE_PREFIX)
}

pub fn gen_toolset_id() -> String {
    gen(TOOLSET_PREFIX)
}

pub fn gen_message_id() -> String {
    gen(MESSAGE_PREFIX)
}

pub fn gen_duplicate_record_id() -> String {
    gen(DUPLICATE_RECORD_PREFIX)
}

pub fn gen_workflow_app_id() -> String {
    gen(WORKFLOW_APP_PREFIX)
}

/// Generate a fresh ID for an entity of the given type.
pub fn gen_entity_id(entity_type: EntityType) -> String {
    match entity_type {
        EntityType::Canvas => gen_canvas_id(),
        EntityType::Document => gen_document_id(),
        EntityType::Resource => gen_resource_id(),
        EntityType::CodeArtifact => gen_code_artifact_id(),
        EntityType::SkillResponse => gen_action_result_id(),
        EntityType::DriveFile => gen_drive_file_id(),
        EntityType::WorkflowApp => gen_workflow_app_id(),
    }
}

/// Characters that may appear inside a generated ID.
pub fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
