//! In-process [`Store`] for tests and local runs.
//!
//! State sits behind one `std::sync::Mutex` that is never held across an
//! `.await`. Named operations can be made to fail with
//! [`MemoryStore::fail_on`] to exercise partial-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use refly_core::error::{CoreError, CoreResult};

use crate::models::action_result::{ActionMessage, ActionResult, ToolCall};
use crate::models::canvas::{Canvas, CanvasEntityRelation, CanvasStateUpdate};
use crate::models::code_artifact::CodeArtifact;
use crate::models::document::Document;
use crate::models::drive_file::DriveFile;
use crate::models::duplicate_record::{DuplicateRecord, DUPLICATE_STATUS_FINISH};
use crate::models::resource::Resource;
use crate::models::share_record::{ShareRecord, UpdateShareRecord};
use crate::models::storage_usage::{StorageUsage, DEFAULT_OBJECT_QUOTA};
use crate::models::toolset::Toolset;
use crate::models::workflow_app::WorkflowApp;
use crate::store::Store;

#[derive(Default)]
struct State {
    canvases: HashMap<String, Canvas>,
    relations: HashMap<String, Vec<CanvasEntityRelation>>,
    documents: HashMap<String, Document>,
    resources: HashMap<String, Resource>,
    code_artifacts: HashMap<String, CodeArtifact>,
    action_results: Vec<ActionResult>,
    tool_calls: Vec<ToolCall>,
    messages: Vec<ActionMessage>,
    drive_files: Vec<DriveFile>,
    toolsets: Vec<Toolset>,
    shares: Vec<ShareRecord>,
    workflow_apps: HashMap<String, WorkflowApp>,
    duplicate_records: Vec<DuplicateRecord>,
    usage: HashMap<String, StorageUsage>,
}

pub struct MemoryStore {
    state: Mutex<State>,
    failing: Mutex<HashSet<String>>,
    default_quota: i64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_OBJECT_QUOTA)
    }
}

impl MemoryStore {
    pub fn new(default_quota: i64) -> Self {
        Self {
            state: Mutex::new(State::default()),
            failing: Mutex::new(HashSet::new()),
            default_quota,
        }
    }

    /// Make every call of the named `Store` method fail with a database error.
    pub fn fail_on(&self, operation: &str) {
        lock(&self.failing).insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        lock(&self.failing).clear();
    }

    /// Set an explicit quota and count for `uid`.
    pub fn set_usage(&self, uid: &str, object_count: i64, object_quota: i64) {
        lock(&self.state).usage.insert(
            uid.to_string(),
            StorageUsage {
                uid: uid.to_string(),
                object_count,
                object_quota,
            },
        );
    }

    // -----------------------------------------------------------------------
    // Inspection helpers
    // -----------------------------------------------------------------------

    pub fn canvases(&self) -> Vec<Canvas> {
        lock(&self.state).canvases.values().cloned().collect()
    }

    pub fn documents(&self) -> Vec<Document> {
        lock(&self.state).documents.values().cloned().collect()
    }

    pub fn resources(&self) -> Vec<Resource> {
        lock(&self.state).resources.values().cloned().collect()
    }

    pub fn code_artifacts(&self) -> Vec<CodeArtifact> {
        lock(&self.state).code_artifacts.values().cloned().collect()
    }

    pub fn action_results(&self) -> Vec<ActionResult> {
        lock(&self.state).action_results.clone()
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        lock(&self.state).tool_calls.clone()
    }

    pub fn action_messages(&self) -> Vec<ActionMessage> {
        lock(&self.state).messages.clone()
    }

    pub fn drive_files(&self) -> Vec<DriveFile> {
        lock(&self.state).drive_files.clone()
    }

    pub fn toolsets(&self) -> Vec<Toolset> {
        lock(&self.state).toolsets.clone()
    }

    /// Every share row, soft-deleted ones included.
    pub fn shares(&self) -> Vec<ShareRecord> {
        lock(&self.state).shares.clone()
    }

    pub fn duplicate_records(&self) -> Vec<DuplicateRecord> {
        lock(&self.state).duplicate_records.clone()
    }

    fn check(&self, operation: &str) -> CoreResult<()> {
        if lock(&self.failing).contains(operation) {
            return Err(CoreError::Database(format!("injected failure in {operation}")));
        }
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

/// A poisoned lock only means another test thread panicked; keep going.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn apply_state_update(state: &mut State, update: &CanvasStateUpdate) -> CoreResult<()> {
    let canvas = state
        .canvases
        .get_mut(&update.canvas_id)
        .filter(|c| c.deleted_at.is_none())
        .ok_or_else(|| CoreError::not_found("Canvas", &update.canvas_id))?;
    canvas.state_storage_key = Some(update.state_storage_key.clone());
    canvas.version = update.version.clone();
    canvas.workflow = update.workflow.clone();
    canvas.status = update.status.clone();
    canvas.updated_at = chrono::Utc::now();
    Ok(())
}

fn insert_unique<V: Clone>(
    map: &mut HashMap<String, V>,
    key: &str,
    value: &V,
    entity: &str,
) -> CoreResult<()> {
    if map.contains_key(key) {
        return Err(CoreError::Conflict(format!("{entity} {key} already exists")));
    }
    map.insert(key.to_string(), value.clone());
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_canvas(&self, canvas_id: &str) -> CoreResult<Option<Canvas>> {
        self.check("find_canvas")?;
        Ok(self
            .state()
            .canvases
            .get(canvas_id)
            .filter(|c| c.deleted_at.is_none())
            .cloned())
    }

    async fn create_canvas(&self, canvas: &Canvas) -> CoreResult<()> {
        self.check("create_canvas")?;
        insert_unique(&mut self.state().canvases, &canvas.canvas_id, canvas, "Canvas")
    }

    async fn update_canvas_state(&self, update: &CanvasStateUpdate) -> CoreResult<()> {
        self.check("update_canvas_state")?;
        apply_state_update(&mut self.state(), update)
    }

    async fn finalize_canvas_duplication(
        &self,
        update: &CanvasStateUpdate,
        record_id: &str,
    ) -> CoreResult<()> {
        self.check("finalize_canvas_duplication")?;
        let mut state = self.state();
        apply_state_update(&mut state, update)?;
        if let Some(record) = state
            .duplicate_records
            .iter_mut()
            .find(|r| r.record_id == record_id)
        {
            record.status = DUPLICATE_STATUS_FINISH.to_string();
            record.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn delete_canvas(&self, canvas_id: &str) -> CoreResult<bool> {
        self.check("delete_canvas")?;
        let mut state = self.state();
        state.relations.remove(canvas_id);
        Ok(state.canvases.remove(canvas_id).is_some())
    }

    async fn replace_canvas_relations(
        &self,
        canvas_id: &str,
        relations: &[CanvasEntityRelation],
    ) -> CoreResult<()> {
        self.check("replace_canvas_relations")?;
        let mut rows = relations.to_vec();
        rows.sort_by(|a, b| {
            (a.entity_type.as_str(), a.entity_id.as_str())
                .cmp(&(b.entity_type.as_str(), b.entity_id.as_str()))
        });
        rows.dedup();
        self.state().relations.insert(canvas_id.to_string(), rows);
        Ok(())
    }

    async fn list_canvas_relations(
        &self,
        canvas_id: &str,
    ) -> CoreResult<Vec<CanvasEntityRelation>> {
        self.check("list_canvas_relations")?;
        Ok(self
            .state()
            .relations
            .get(canvas_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_document(&self, doc_id: &str) -> CoreResult<Option<Document>> {
        self.check("find_document")?;
        Ok(self.state().documents.get(doc_id).cloned())
    }

    async fn create_document(&self, doc: &Document) -> CoreResult<()> {
        self.check("create_document")?;
        insert_unique(&mut self.state().documents, &doc.doc_id, doc, "Document")
    }

    async fn find_resource(&self, resource_id: &str) -> CoreResult<Option<Resource>> {
        self.check("find_resource")?;
        Ok(self.state().resources.get(resource_id).cloned())
    }

    async fn create_resource(&self, resource: &Resource) -> CoreResult<()> {
        self.check("create_resource")?;
        insert_unique(
            &mut self.state().resources,
            &resource.resource_id,
            resource,
            "Resource",
        )
    }

    async fn find_code_artifact(&self, artifact_id: &str) -> CoreResult<Option<CodeArtifact>> {
        self.check("find_code_artifact")?;
        Ok(self.state().code_artifacts.get(artifact_id).cloned())
    }

    async fn create_code_artifact(&self, artifact: &CodeArtifact) -> CoreResult<()> {
        self.check("create_code_artifact")?;
        insert_unique(
            &mut self.state().code_artifacts,
            &artifact.artifact_id,
            artifact,
            "CodeArtifact",
        )
    }

    async fn find_action_result(&self, result_id: &str) -> CoreResult<Option<ActionResult>> {
        self.check("find_action_result")?;
        Ok(self
            .state()
            .action_results
            .iter()
            .filter(|r| r.result_id == result_id)
            .max_by_key(|r| r.version)
            .cloned())
    }

    async fn create_action_result(&self, result: &ActionResult) -> CoreResult<()> {
        self.check("create_action_result")?;
        let mut state = self.state();
        if state
            .action_results
            .iter()
            .any(|r| r.result_id == result.result_id && r.version == result.version)
        {
            return Err(CoreError::Conflict(format!(
                "ActionResult {} v{} already exists",
                result.result_id, result.version
            )));
        }
        state.action_results.push(result.clone());
        Ok(())
    }

    async fn list_tool_calls(&self, result_id: &str, version: i32) -> CoreResult<Vec<ToolCall>> {
        self.check("list_tool_calls")?;
        Ok(self
            .state()
            .tool_calls
            .iter()
            .filter(|c| c.result_id == result_id && c.version == version)
            .cloned()
            .collect())
    }

    async fn create_tool_calls(&self, calls: &[ToolCall]) -> CoreResult<()> {
        self.check("create_tool_calls")?;
        let mut state = self.state();
        if let Some(dup) = calls
            .iter()
            .find(|c| state.tool_calls.iter().any(|e| e.call_id == c.call_id))
        {
            return Err(CoreError::Conflict(format!(
                "ToolCall {} already exists",
                dup.call_id
            )));
        }
        state.tool_calls.extend_from_slice(calls);
        Ok(())
    }

    async fn list_action_messages(
        &self,
        result_id: &str,
        version: i32,
    ) -> CoreResult<Vec<ActionMessage>> {
        self.check("list_action_messages")?;
        Ok(self
            .state()
            .messages
            .iter()
            .filter(|m| m.result_id == result_id && m.version == version)
            .cloned()
            .collect())
    }

    async fn create_action_messages(&self, messages: &[ActionMessage]) -> CoreResult<()> {
        self.check("create_action_messages")?;
        self.state().messages.extend_from_slice(messages);
        Ok(())
    }

    async fn list_drive_files(&self, canvas_id: &str) -> CoreResult<Vec<DriveFile>> {
        self.check("list_drive_files")?;
        Ok(self
            .state()
            .drive_files
            .iter()
            .filter(|f| f.canvas_id == canvas_id && f.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_drive_file(&self, file_id: &str) -> CoreResult<Option<DriveFile>> {
        self.check("find_drive_file")?;
        Ok(self
            .state()
            .drive_files
            .iter()
            .find(|f| f.file_id == file_id && f.deleted_at.is_none())
            .cloned())
    }

    async fn create_drive_file(&self, file: &DriveFile) -> CoreResult<()> {
        self.check("create_drive_file")?;
        self.state().drive_files.push(file.clone());
        Ok(())
    }

    async fn list_toolsets_by_ids(&self, ids: &[String]) -> CoreResult<Vec<Toolset>> {
        self.check("list_toolsets_by_ids")?;
        Ok(self
            .state()
            .toolsets
            .iter()
            .filter(|t| t.deleted_at.is_none() && ids.contains(&t.toolset_id))
            .cloned()
            .collect())
    }

    async fn list_user_toolsets(&self, uid: &str) -> CoreResult<Vec<Toolset>> {
        self.check("list_user_toolsets")?;
        Ok(self
            .state()
            .toolsets
            .iter()
            .filter(|t| t.uid == uid && t.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn create_toolset(&self, toolset: &Toolset) -> CoreResult<()> {
        self.check("create_toolset")?;
        self.state().toolsets.push(toolset.clone());
        Ok(())
    }

    async fn find_active_share(
        &self,
        uid: &str,
        entity_id: &str,
        entity_type: &str,
        parent_share_id: Option<&str>,
    ) -> CoreResult<Option<ShareRecord>> {
        self.check("find_active_share")?;
        Ok(self
            .state()
            .shares
            .iter()
            .find(|s| {
                s.deleted_at.is_none()
                    && s.uid == uid
                    && s.entity_id == entity_id
                    && s.entity_type == entity_type
                    && s.parent_share_id.as_deref() == parent_share_id
            })
            .cloned())
    }

    async fn find_share(&self, share_id: &str) -> CoreResult<Option<ShareRecord>> {
        self.check("find_share")?;
        Ok(self
            .state()
            .shares
            .iter()
            .find(|s| s.share_id == share_id && s.deleted_at.is_none())
            .cloned())
    }

    async fn create_share(&self, record: &ShareRecord) -> CoreResult<()> {
        self.check("create_share")?;
        let mut state = self.state();
        let clash = state.shares.iter().any(|s| {
            s.share_id == record.share_id
                || (s.deleted_at.is_none()
                    && s.uid == record.uid
                    && s.entity_id == record.entity_id
                    && s.entity_type == record.entity_type
                    && s.parent_share_id == record.parent_share_id)
        });
        if clash {
            return Err(CoreError::Conflict(format!(
                "share for {} {} already exists",
                record.entity_type, record.entity_id
            )));
        }
        state.shares.push(record.clone());
        Ok(())
    }

    async fn update_share(
        &self,
        share_id: &str,
        input: &UpdateShareRecord,
    ) -> CoreResult<ShareRecord> {
        self.check("update_share")?;
        let mut state = self.state();
        let record = state
            .shares
            .iter_mut()
            .find(|s| s.share_id == share_id && s.deleted_at.is_none())
            .ok_or_else(|| CoreError::not_found("Share", share_id))?;
        record.title = input.title.clone();
        record.storage_key = input.storage_key.clone();
        record.allow_duplication = input.allow_duplication;
        record.updated_at = chrono::Utc::now();
        Ok(record.clone())
    }

    async fn list_child_shares(&self, parent_share_id: &str) -> CoreResult<Vec<ShareRecord>> {
        self.check("list_child_shares")?;
        Ok(self
            .state()
            .shares
            .iter()
            .filter(|s| {
                s.deleted_at.is_none() && s.parent_share_id.as_deref() == Some(parent_share_id)
            })
            .cloned()
            .collect())
    }

    async fn soft_delete_shares(&self, share_ids: &[String]) -> CoreResult<u64> {
        self.check("soft_delete_shares")?;
        let now = chrono::Utc::now();
        let mut deleted = 0;
        for record in self.state().shares.iter_mut() {
            if record.deleted_at.is_none() && share_ids.contains(&record.share_id) {
                record.deleted_at = Some(now);
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn find_workflow_app(&self, app_id: &str) -> CoreResult<Option<WorkflowApp>> {
        self.check("find_workflow_app")?;
        Ok(self
            .state()
            .workflow_apps
            .get(app_id)
            .filter(|a| a.deleted_at.is_none())
            .cloned())
    }

    async fn create_workflow_app(&self, app: &WorkflowApp) -> CoreResult<()> {
        self.check("create_workflow_app")?;
        insert_unique(&mut self.state().workflow_apps, &app.app_id, app, "WorkflowApp")
    }

    async fn update_workflow_app_shares(
        &self,
        app_id: &str,
        share_id: &str,
        template_share_id: Option<&str>,
    ) -> CoreResult<()> {
        self.check("update_workflow_app_shares")?;
        let mut state = self.state();
        let app = state
            .workflow_apps
            .get_mut(app_id)
            .filter(|a| a.deleted_at.is_none())
            .ok_or_else(|| CoreError::not_found("WorkflowApp", app_id))?;
        app.share_id = Some(share_id.to_string());
        app.template_share_id = template_share_id.map(str::to_string);
        app.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn create_duplicate_record(&self, record: &DuplicateRecord) -> CoreResult<()> {
        self.check("create_duplicate_record")?;
        self.state().duplicate_records.push(record.clone());
        Ok(())
    }

    async fn update_duplicate_record_status(&self, record_id: &str, status: &str) -> CoreResult<()> {
        self.check("update_duplicate_record_status")?;
        if let Some(record) = self
            .state()
            .duplicate_records
            .iter_mut()
            .find(|r| r.record_id == record_id)
        {
            record.status = status.to_string();
            record.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn get_storage_usage(&self, uid: &str) -> CoreResult<StorageUsage> {
        self.check("get_storage_usage")?;
        Ok(self
            .state()
            .usage
            .get(uid)
            .cloned()
            .unwrap_or_else(|| StorageUsage::empty(uid, self.default_quota)))
    }

    async fn increment_object_count(&self, uid: &str, delta: i64) -> CoreResult<()> {
        self.check("increment_object_count")?;
        let default_quota = self.default_quota;
        let mut state = self.state();
        let usage = state
            .usage
            .entry(uid.to_string())
            .or_insert_with(|| StorageUsage::empty(uid, default_quota));
        usage.object_count = (usage.object_count + delta).max(0);
        Ok(())
    }
}
