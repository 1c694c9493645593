//! [`Store`] backed by Postgres through the `*Repo` structs.

use async_trait::async_trait;
use refly_core::error::{CoreError, CoreResult};

use crate::error::db_error;
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
use crate::repositories::{
    ActionMessageRepo, ActionResultRepo, CanvasEntityRelationRepo, CanvasRepo, CodeArtifactRepo,
    DocumentRepo, DriveFileRepo, DuplicateRecordRepo, ResourceRepo, ShareRecordRepo,
    StorageUsageRepo, ToolCallRepo, ToolsetRepo, WorkflowAppRepo,
};
use crate::store::Store;
use crate::DbPool;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    default_quota: i64,
}

impl PgStore {
    pub fn new(pool: DbPool, default_quota: i64) -> Self {
        Self { pool, default_quota }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_canvas(&self, canvas_id: &str) -> CoreResult<Option<Canvas>> {
        CanvasRepo::find_by_id(&self.pool, canvas_id)
            .await
            .map_err(db_error)
    }

    async fn create_canvas(&self, canvas: &Canvas) -> CoreResult<()> {
        CanvasRepo::create(&self.pool, canvas).await.map_err(db_error)?;
        Ok(())
    }

    async fn update_canvas_state(&self, update: &CanvasStateUpdate) -> CoreResult<()> {
        let updated = CanvasRepo::update_state(&self.pool, update)
            .await
            .map_err(db_error)?;
        if !updated {
            return Err(CoreError::not_found("Canvas", &update.canvas_id));
        }
        Ok(())
    }

    async fn finalize_canvas_duplication(
        &self,
        update: &CanvasStateUpdate,
        record_id: &str,
    ) -> CoreResult<()> {
        CanvasRepo::finalize_duplication(&self.pool, update, record_id)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => CoreError::not_found("Canvas", &update.canvas_id),
                other => db_error(other),
            })
    }

    async fn delete_canvas(&self, canvas_id: &str) -> CoreResult<bool> {
        CanvasRepo::hard_delete(&self.pool, canvas_id)
            .await
            .map_err(db_error)
    }

    async fn replace_canvas_relations(
        &self,
        canvas_id: &str,
        relations: &[CanvasEntityRelation],
    ) -> CoreResult<()> {
        CanvasEntityRelationRepo::replace(&self.pool, canvas_id, relations)
            .await
            .map_err(db_error)
    }

    async fn list_canvas_relations(
        &self,
        canvas_id: &str,
    ) -> CoreResult<Vec<CanvasEntityRelation>> {
        CanvasEntityRelationRepo::list_by_canvas(&self.pool, canvas_id)
            .await
            .map_err(db_error)
    }

    async fn find_document(&self, doc_id: &str) -> CoreResult<Option<Document>> {
        DocumentRepo::find_by_id(&self.pool, doc_id)
            .await
            .map_err(db_error)
    }

    async fn create_document(&self, doc: &Document) -> CoreResult<()> {
        DocumentRepo::create(&self.pool, doc).await.map_err(db_error)?;
        Ok(())
    }

    async fn find_resource(&self, resource_id: &str) -> CoreResult<Option<Resource>> {
        ResourceRepo::find_by_id(&self.pool, resource_id)
            .await
            .map_err(db_error)
    }

    async fn create_resource(&self, resource: &Resource) -> CoreResult<()> {
        ResourceRepo::create(&self.pool, resource)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn find_code_artifact(&self, artifact_id: &str) -> CoreResult<Option<CodeArtifact>> {
        CodeArtifactRepo::find_by_id(&self.pool, artifact_id)
            .await
            .map_err(db_error)
    }

    async fn create_code_artifact(&self, artifact: &CodeArtifact) -> CoreResult<()> {
        CodeArtifactRepo::create(&self.pool, artifact)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn find_action_result(&self, result_id: &str) -> CoreResult<Option<ActionResult>> {
        ActionResultRepo::find_latest(&self.pool, result_id)
            .await
            .map_err(db_error)
    }

    async fn create_action_result(&self, result: &ActionResult) -> CoreResult<()> {
        ActionResultRepo::create(&self.pool, result)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn list_tool_calls(&self, result_id: &str, version: i32) -> CoreResult<Vec<ToolCall>> {
        ToolCallRepo::list_for_result(&self.pool, result_id, version)
            .await
            .map_err(db_error)
    }

    async fn create_tool_calls(&self, calls: &[ToolCall]) -> CoreResult<()> {
        ToolCallRepo::create_many(&self.pool, calls)
            .await
            .map_err(db_error)
    }

    async fn list_action_messages(
        &self,
        result_id: &str,
        version: i32,
    ) -> CoreResult<Vec<ActionMessage>> {
        ActionMessageRepo::list_for_result(&self.pool, result_id, version)
            .await
            .map_err(db_error)
    }

    async fn create_action_messages(&self, messages: &[ActionMessage]) -> CoreResult<()> {
        ActionMessageRepo::create_many(&self.pool, messages)
            .await
            .map_err(db_error)
    }

    async fn list_drive_files(&self, canvas_id: &str) -> CoreResult<Vec<DriveFile>> {
        DriveFileRepo::list_by_canvas(&self.pool, canvas_id)
            .await
            .map_err(db_error)
    }

    async fn find_drive_file(&self, file_id: &str) -> CoreResult<Option<DriveFile>> {
        DriveFileRepo::find_by_id(&self.pool, file_id)
            .await
            .map_err(db_error)
    }

    async fn create_drive_file(&self, file: &DriveFile) -> CoreResult<()> {
        DriveFileRepo::create(&self.pool, file)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn list_toolsets_by_ids(&self, ids: &[String]) -> CoreResult<Vec<Toolset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ToolsetRepo::list_by_ids(&self.pool, ids)
            .await
            .map_err(db_error)
    }

    async fn list_user_toolsets(&self, uid: &str) -> CoreResult<Vec<Toolset>> {
        ToolsetRepo::list_by_user(&self.pool, uid)
            .await
            .map_err(db_error)
    }

    async fn create_toolset(&self, toolset: &Toolset) -> CoreResult<()> {
        ToolsetRepo::create(&self.pool, toolset)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn find_active_share(
        &self,
        uid: &str,
        entity_id: &str,
        entity_type: &str,
        parent_share_id: Option<&str>,
    ) -> CoreResult<Option<ShareRecord>> {
        ShareRecordRepo::find_active(&self.pool, uid, entity_id, entity_type, parent_share_id)
            .await
            .map_err(db_error)
    }

    async fn find_share(&self, share_id: &str) -> CoreResult<Option<ShareRecord>> {
        ShareRecordRepo::find_by_share_id(&self.pool, share_id)
            .await
            .map_err(db_error)
    }

    async fn create_share(&self, record: &ShareRecord) -> CoreResult<()> {
        ShareRecordRepo::create(&self.pool, record)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn update_share(
        &self,
        share_id: &str,
        input: &UpdateShareRecord,
    ) -> CoreResult<ShareRecord> {
        ShareRecordRepo::update(&self.pool, share_id, input)
            .await
            .map_err(db_error)?
            .ok_or_else(|| CoreError::not_found("Share", share_id))
    }

    async fn list_child_shares(&self, parent_share_id: &str) -> CoreResult<Vec<ShareRecord>> {
        ShareRecordRepo::list_children(&self.pool, parent_share_id)
            .await
            .map_err(db_error)
    }

    async fn soft_delete_shares(&self, share_ids: &[String]) -> CoreResult<u64> {
        ShareRecordRepo::soft_delete_many(&self.pool, share_ids)
            .await
            .map_err(db_error)
    }

    async fn find_workflow_app(&self, app_id: &str) -> CoreResult<Option<WorkflowApp>> {
        WorkflowAppRepo::find_by_id(&self.pool, app_id)
            .await
            .map_err(db_error)
    }

    async fn create_workflow_app(&self, app: &WorkflowApp) -> CoreResult<()> {
        WorkflowAppRepo::create(&self.pool, app)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn update_workflow_app_shares(
        &self,
        app_id: &str,
        share_id: &str,
        template_share_id: Option<&str>,
    ) -> CoreResult<()> {
        let updated =
            WorkflowAppRepo::update_shares(&self.pool, app_id, share_id, template_share_id)
                .await
                .map_err(db_error)?;
        if !updated {
            return Err(CoreError::not_found("WorkflowApp", app_id));
        }
        Ok(())
    }

    async fn create_duplicate_record(&self, record: &DuplicateRecord) -> CoreResult<()> {
        DuplicateRecordRepo::create(&self.pool, record)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn update_duplicate_record_status(&self, record_id: &str, status: &str) -> CoreResult<()> {
        DuplicateRecordRepo::update_status(&self.pool, record_id, status)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn get_storage_usage(&self, uid: &str) -> CoreResult<StorageUsage> {
        let usage = StorageUsageRepo::find(&self.pool, uid)
            .await
            .map_err(db_error)?;
        Ok(usage.unwrap_or_else(|| StorageUsage::empty(uid, self.default_quota)))
    }

    async fn increment_object_count(&self, uid: &str, delta: i64) -> CoreResult<()> {
        StorageUsageRepo::increment(&self.pool, uid, delta, self.default_quota)
            .await
            .map_err(db_error)
    }
}
