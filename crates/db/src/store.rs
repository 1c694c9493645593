//! The persistence seam used by the service layer.
//!
//! [`PgStore`](crate::pg_store::PgStore) backs it with Postgres;
//! [`MemoryStore`](crate::memory::MemoryStore) keeps everything in process.

use async_trait::async_trait;
use refly_core::error::CoreResult;

use crate::models::action_result::{ActionMessage, ActionResult, ToolCall};
use crate::models::canvas::{Canvas, CanvasEntityRelation, CanvasStateUpdate};
use crate::models::code_artifact::CodeArtifact;
use crate::models::document::Document;
use crate::models::drive_file::DriveFile;
use crate::models::duplicate_record::DuplicateRecord;
use crate::models::resource::Resource;
use crate::models::share_record::{ShareRecord, UpdateShareRecord};
use crate::models::storage_usage::StorageUsage;
use crate::models::toolset::Toolset;
use crate::models::workflow_app::WorkflowApp;

#[async_trait]
pub trait Store: Send + Sync {
    // -----------------------------------------------------------------------
    // Canvases
    // -----------------------------------------------------------------------

    /// Live canvas by ID.
    async fn find_canvas(&self, canvas_id: &str) -> CoreResult<Option<Canvas>>;
    async fn create_canvas(&self, canvas: &Canvas) -> CoreResult<()>;
    /// Fails with `NotFound` when the canvas does not exist.
    async fn update_canvas_state(&self, update: &CanvasStateUpdate) -> CoreResult<()>;
    /// Write the duplicated canvas state and finish its duplicate record atomically.
    async fn finalize_canvas_duplication(
        &self,
        update: &CanvasStateUpdate,
        record_id: &str,
    ) -> CoreResult<()>;
    async fn delete_canvas(&self, canvas_id: &str) -> CoreResult<bool>;
    async fn replace_canvas_relations(
        &self,
        canvas_id: &str,
        relations: &[CanvasEntityRelation],
    ) -> CoreResult<()>;
    async fn list_canvas_relations(&self, canvas_id: &str)
        -> CoreResult<Vec<CanvasEntityRelation>>;

    // -----------------------------------------------------------------------
    // Library entities and skill responses
    // -----------------------------------------------------------------------

    /// Document by ID, soft-deleted rows included.
    async fn find_document(&self, doc_id: &str) -> CoreResult<Option<Document>>;
    async fn create_document(&self, doc: &Document) -> CoreResult<()>;
    async fn find_resource(&self, resource_id: &str) -> CoreResult<Option<Resource>>;
    async fn create_resource(&self, resource: &Resource) -> CoreResult<()>;
    async fn find_code_artifact(&self, artifact_id: &str) -> CoreResult<Option<CodeArtifact>>;
    async fn create_code_artifact(&self, artifact: &CodeArtifact) -> CoreResult<()>;
    /// Highest version of an action result.
    async fn find_action_result(&self, result_id: &str) -> CoreResult<Option<ActionResult>>;
    async fn create_action_result(&self, result: &ActionResult) -> CoreResult<()>;
    async fn list_tool_calls(&self, result_id: &str, version: i32) -> CoreResult<Vec<ToolCall>>;
    async fn create_tool_calls(&self, calls: &[ToolCall]) -> CoreResult<()>;
    async fn list_action_messages(
        &self,
        result_id: &str,
        version: i32,
    ) -> CoreResult<Vec<ActionMessage>>;
    async fn create_action_messages(&self, messages: &[ActionMessage]) -> CoreResult<()>;

    // -----------------------------------------------------------------------
    // Drive files and toolsets
    // -----------------------------------------------------------------------

    async fn list_drive_files(&self, canvas_id: &str) -> CoreResult<Vec<DriveFile>>;
    async fn find_drive_file(&self, file_id: &str) -> CoreResult<Option<DriveFile>>;
    async fn create_drive_file(&self, file: &DriveFile) -> CoreResult<()>;
    async fn list_toolsets_by_ids(&self, ids: &[String]) -> CoreResult<Vec<Toolset>>;
    async fn list_user_toolsets(&self, uid: &str) -> CoreResult<Vec<Toolset>>;
    async fn create_toolset(&self, toolset: &Toolset) -> CoreResult<()>;

    // -----------------------------------------------------------------------
    // Shares and workflow apps
    // -----------------------------------------------------------------------

    async fn find_active_share(
        &self,
        uid: &str,
        entity_id: &str,
        entity_type: &str,
        parent_share_id: Option<&str>,
    ) -> CoreResult<Option<ShareRecord>>;
    /// Live share by public ID.
    async fn find_share(&self, share_id: &str) -> CoreResult<Option<ShareRecord>>;
    /// Fails with `Conflict` when a live share with the same key exists.
    async fn create_share(&self, record: &ShareRecord) -> CoreResult<()>;
    async fn update_share(&self, share_id: &str, input: &UpdateShareRecord)
        -> CoreResult<ShareRecord>;
    async fn list_child_shares(&self, parent_share_id: &str) -> CoreResult<Vec<ShareRecord>>;
    async fn soft_delete_shares(&self, share_ids: &[String]) -> CoreResult<u64>;
    async fn find_workflow_app(&self, app_id: &str) -> CoreResult<Option<WorkflowApp>>;
    async fn create_workflow_app(&self, app: &WorkflowApp) -> CoreResult<()>;
    async fn update_workflow_app_shares(
        &self,
        app_id: &str,
        share_id: &str,
        template_share_id: Option<&str>,
    ) -> CoreResult<()>;

    // -----------------------------------------------------------------------
    // Audit and usage
    // -----------------------------------------------------------------------

    async fn create_duplicate_record(&self, record: &DuplicateRecord) -> CoreResult<()>;
    async fn update_duplicate_record_status(&self, record_id: &str, status: &str)
        -> CoreResult<()>;
    /// Usage row for `uid`, or an empty row with the default quota.
    async fn get_storage_usage(&self, uid: &str) -> CoreResult<StorageUsage>;
    async fn increment_object_count(&self, uid: &str, delta: i64) -> CoreResult<()>;
}
