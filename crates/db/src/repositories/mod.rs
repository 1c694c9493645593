//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod action_result_repo;
pub mod canvas_repo;
pub mod code_artifact_repo;
pub mod document_repo;
pub mod drive_file_repo;
pub mod duplicate_record_repo;
pub mod resource_repo;
pub mod share_record_repo;
pub mod storage_usage_repo;
pub mod toolset_repo;
pub mod workflow_app_repo;

pub use action_result_repo::{ActionMessageRepo, ActionResultRepo, ToolCallRepo};
pub use canvas_repo::{CanvasEntityRelationRepo, CanvasRepo};
pub use code_artifact_repo::CodeArtifactRepo;
pub use document_repo::DocumentRepo;
pub use drive_file_repo::DriveFileRepo;
pub use duplicate_record_repo::DuplicateRecordRepo;
pub use resource_repo::ResourceRepo;
pub use share_record_repo::ShareRecordRepo;
pub use storage_usage_repo::StorageUsageRepo;
pub use toolset_repo::ToolsetRepo;
pub use workflow_app_repo::WorkflowAppRepo;
