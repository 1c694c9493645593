//! Shared fixtures for service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use refly_core::canvas::{CanvasEdge, CanvasNode, CanvasState, SelectedToolset};
use refly_core::keys;
use refly_core::store::SearchIndex;
use refly_core::workflow::Workflow;
use refly_db::lock::LocalLock;
use refly_db::models::action_result::{ActionMessage, ActionResult, ToolCall};
use refly_db::models::canvas::{Canvas, CANVAS_STATUS_READY};
use refly_db::models::code_artifact::CodeArtifact;
use refly_db::models::document::Document;
use refly_db::models::drive_file::DriveFile;
use refly_db::models::resource::Resource;
use refly_db::models::toolset::Toolset;
use refly_db::models::workflow_app::WorkflowApp;
use refly_db::search::MemorySearchIndex;
use refly_db::{MemoryStore, Store};
use refly_services::{ServiceConfig, ServiceContext};
use refly_storage::{MemoryStorage, ObjectStorage};
use serde_json::json;

pub const UID: &str = "u-owner";
pub const OTHER_UID: &str = "u-other";

/// In-memory backends plus a context wired to them.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryStorage>,
    pub search: Arc<MemorySearchIndex>,
    pub ctx: ServiceContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new(config.default_object_quota));
        let storage = Arc::new(MemoryStorage::new());
        let search = Arc::new(MemorySearchIndex::default());
        let ctx = ServiceContext::new(
            store.clone(),
            storage.clone(),
            search.clone(),
            Arc::new(LocalLock::default()),
            config,
        );
        Self {
            store,
            storage,
            search,
            ctx,
        }
    }

    pub async fn put_text(&self, key: &str, text: &str) {
        self.storage
            .put_object(key, Bytes::from(text.to_string()), "text/plain")
            .await
            .unwrap();
    }

    pub async fn read_text(&self, key: &str) -> String {
        let body = self.storage.get_object(key).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    pub async fn read_state(&self, canvas_id: &str) -> (Canvas, CanvasState, Workflow) {
        let canvas = self.store.find_canvas(canvas_id).await.unwrap().unwrap();
        let key = canvas.state_storage_key.clone().unwrap();
        let body = self.storage.get_object(&key).await.unwrap();
        let state: CanvasState = serde_json::from_slice(&body).unwrap();
        let workflow = Workflow::from_value(&canvas.workflow).unwrap();
        (canvas, state, workflow)
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    pub async fn seed_document(&self, doc_id: &str, text: &str) {
        let key = keys::document_key(doc_id);
        self.put_text(&key, text).await;
        let now = Utc::now();
        self.store
            .create_document(&Document {
                doc_id: doc_id.into(),
                uid: UID.into(),
                title: format!("Doc {doc_id}"),
                canvas_id: Some("c-src".into()),
                project_id: None,
                storage_key: key,
                content_preview: Some(text.chars().take(20).collect()),
                word_count: text.split_whitespace().count() as i32,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();
        self.search
            .upsert_document(refly_core::store::SearchDocument {
                id: doc_id.into(),
                uid: UID.into(),
                entity_type: "document".into(),
                title: format!("Doc {doc_id}"),
                content: text.into(),
            })
            .await
            .unwrap();
    }

    pub async fn seed_resource(&self, resource_id: &str, text: &str) {
        let key = keys::resource_key(resource_id);
        let raw = format!("uploads/{resource_id}/paper.pdf");
        self.put_text(&key, text).await;
        self.put_text(&raw, "%PDF").await;
        let now = Utc::now();
        self.store
            .create_resource(&Resource {
                resource_id: resource_id.into(),
                uid: UID.into(),
                title: format!("Resource {resource_id}"),
                resource_type: "file".into(),
                canvas_id: Some("c-src".into()),
                project_id: None,
                storage_key: Some(key),
                raw_file_key: Some(raw),
                content_preview: None,
                meta: json!({"pages": 3}),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();
    }

    pub async fn seed_code_artifact(&self, artifact_id: &str, code: &str) {
        let key = keys::code_artifact_key(artifact_id);
        self.put_text(&key, code).await;
        let now = Utc::now();
        self.store
            .create_code_artifact(&CodeArtifact {
                artifact_id: artifact_id.into(),
                uid: UID.into(),
                title: "Chart".into(),
                language: Some("python".into()),
                artifact_type: Some("application/code".into()),
                canvas_id: Some("c-src".into()),
                storage_key: key,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();
    }

    /// A result at version 2 with two calls of the same tool and a message
    /// per call. Its context points at `context_entity`.
    pub async fn seed_action_result(&self, result_id: &str, context_entity: &str) {
        let now = Utc::now();
        self.store
            .create_action_result(&ActionResult {
                result_id: result_id.into(),
                version: 2,
                uid: UID.into(),
                title: "Research".into(),
                target_id: Some("c-src".into()),
                status: "finish".into(),
                input: json!({"query": format!("summarize {context_entity}")}),
                context: json!({"documents": [{"entityId": context_entity}]}),
                tool_sets: json!([{"id": "ts-src"}]),
                actual_tools: json!([]),
                history: json!([]),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();
        let calls: Vec<ToolCall> = ["tc-old-1", "tc-old-2"]
            .iter()
            .map(|id| ToolCall {
                call_id: (*id).into(),
                result_id: result_id.into(),
                version: 2,
                toolset_id: "ts-src".into(),
                tool_name: "web_search".into(),
                step_name: None,
                input: json!({"q": "rust"}),
                output: json!({"hits": 1}),
                status: "completed".into(),
                created_at: now,
            })
            .collect();
        self.store.create_tool_calls(&calls).await.unwrap();
        let messages: Vec<ActionMessage> = calls
            .iter()
            .enumerate()
            .map(|(i, call)| ActionMessage {
                message_id: format!("m-old-{i}"),
                result_id: result_id.into(),
                version: 2,
                kind: "tool".into(),
                content: format!("called {}", call.call_id),
                tool_call_id: Some(call.call_id.clone()),
                created_at: now,
            })
            .collect();
        self.store.create_action_messages(&messages).await.unwrap();
    }

    pub async fn seed_drive_file(&self, canvas_id: &str, file_id: &str, name: &str) -> String {
        let key = keys::drive_file_key(UID, canvas_id, file_id, name);
        self.put_text(&key, "file body").await;
        self.store
            .create_drive_file(&DriveFile {
                file_id: file_id.into(),
                uid: UID.into(),
                canvas_id: canvas_id.into(),
                name: name.into(),
                mime_type: "text/csv".into(),
                storage_key: key.clone(),
                size: 9,
                source: "upload".into(),
                created_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();
        key
    }

    pub async fn seed_toolset(&self, uid: &str, toolset_id: &str, key: &str) {
        self.store
            .create_toolset(&Toolset {
                toolset_id: toolset_id.into(),
                uid: uid.into(),
                key: key.into(),
                name: key.to_uppercase(),
                auth_type: None,
                config: json!({}),
                created_at: Utc::now(),
                deleted_at: None,
            })
            .await
            .unwrap();
    }

    pub async fn seed_canvas(&self, canvas_id: &str, state: CanvasState, workflow: serde_json::Value) {
        let version = "000000000000001".to_string();
        let key = keys::canvas_state_key(canvas_id, &version);
        let state = CanvasState { version: version.clone(), ..state };
        self.storage
            .put_object(&key, Bytes::from(serde_json::to_vec(&state).unwrap()), "application/json")
            .await
            .unwrap();
        let now = Utc::now();
        self.store
            .create_canvas(&Canvas {
                canvas_id: canvas_id.into(),
                uid: UID.into(),
                title: "Source canvas".into(),
                status: CANVAS_STATUS_READY.into(),
                version,
                state_storage_key: Some(key),
                workflow,
                project_id: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();
    }

    pub async fn seed_workflow_app(&self, app_id: &str, canvas_id: &str) {
        let now = Utc::now();
        self.store
            .create_workflow_app(&WorkflowApp {
                app_id: app_id.into(),
                uid: UID.into(),
                canvas_id: canvas_id.into(),
                title: "Weekly digest".into(),
                description: Some("Summarizes the week".into()),
                share_id: None,
                template_share_id: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();
    }

    /// The standard source canvas `c-src`:
    ///
    /// - `n-doc` → document `d-1`, `n-res` → resource `r-1`,
    ///   `n-code` → code artifact `ca-1`, `n-skill` → result `ar-1`
    ///   (context points at `d-1`), `n-memo` without an entity
    /// - edges `n-doc → n-skill`, `n-skill → n-code`, `n-memo → n-res`
    /// - drive file `df-1` referenced by a workflow variable
    /// - the skill node selects toolset `ts-src`
    pub async fn seed_standard_canvas(&self) {
        self.seed_document("d-1", "hello world from d-1").await;
        self.seed_resource("r-1", "resource text").await;
        self.seed_code_artifact("ca-1", "print('hi')").await;
        self.seed_action_result("ar-1", "d-1").await;
        let file_key = self.seed_drive_file("c-src", "df-1", "data.csv").await;
        self.seed_toolset(UID, "ts-src", "web_search").await;

        let mut skill = CanvasNode::new("n-skill", refly_core::canvas::NodeType::SkillResponse, "ar-1");
        skill.data.metadata.context_items = Some(json!([{"entityId": "d-1", "type": "document"}]));
        skill.data.metadata.structured_data = Some(json!({"query": "compare d-1 with r-1"}));
        skill.data.metadata.selected_toolsets = Some(vec![SelectedToolset {
            id: "ts-src".into(),
            toolset_type: Some("regular".into()),
            name: Some("Web search".into()),
            extra: Default::default(),
        }]);
        let state = CanvasState::new(
            vec![
                CanvasNode::new("n-doc", refly_core::canvas::NodeType::Document, "d-1"),
                CanvasNode::new("n-res", refly_core::canvas::NodeType::Resource, "r-1"),
                CanvasNode::new("n-code", refly_core::canvas::NodeType::CodeArtifact, "ca-1"),
                skill,
                CanvasNode::new("n-memo", refly_core::canvas::NodeType::Memo, ""),
            ],
            vec![
                CanvasEdge::new("e-1", "n-doc", "n-skill"),
                CanvasEdge::new("e-2", "n-skill", "n-code"),
                CanvasEdge::new("e-3", "n-memo", "n-res"),
            ],
        );
        let workflow = json!({
            "variables": [{
                "variableId": "var-1",
                "name": "dataset",
                "value": [{
                    "type": "resource",
                    "resource": {
                        "name": "data.csv",
                        "fileType": "document",
                        "fileId": "df-1",
                        "storageKey": file_key
                    }
                }]
            }]
        });
        self.seed_canvas("c-src", state, workflow).await;
    }
}
