//! Shared helpers for HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use refly_core::canvas::{CanvasEdge, CanvasNode, CanvasState, NodeType};
use refly_core::keys;
use refly_db::lock::LocalLock;
use refly_db::models::canvas::{Canvas, CANVAS_STATUS_READY};
use refly_db::models::document::Document;
use refly_db::search::MemorySearchIndex;
use refly_db::{MemoryStore, Store};
use refly_services::{ServiceConfig, ServiceContext};
use refly_storage::{MemoryStorage, ObjectStorage};
use tower::ServiceExt;

use refly_api::auth::jwt::{generate_access_token, JwtConfig};
use refly_api::config::ServerConfig;
use refly_api::router::build_app_router;
use refly_api::state::AppState;

pub const OWNER: &str = "u-owner";
pub const VISITOR: &str = "u-visitor";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// The application router over in-memory backends, plus handles on those
/// backends for seeding and inspection.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryStorage>,
    pub config: ServerConfig,
}

pub fn build_test_app() -> TestApp {
    let config = test_config();
    let service_config = ServiceConfig::default();
    let store = Arc::new(MemoryStore::new(service_config.default_object_quota));
    let storage = Arc::new(MemoryStorage::new());
    let services = ServiceContext::new(
        store.clone(),
        storage.clone(),
        Arc::new(MemorySearchIndex::default()),
        Arc::new(LocalLock::default()),
        service_config,
    );

    let state = AppState {
        services,
        pool: None,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        storage,
        config,
    }
}

impl TestApp {
    pub fn token(&self, uid: &str) -> String {
        generate_access_token(uid, &self.config.jwt).unwrap()
    }

    pub async fn get(&self, uri: &str, uid: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(uid) = uid {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(uid)));
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post(&self, uri: &str, uid: Option<&str>, body: serde_json::Value) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(uid) = uid {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(uid)));
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Seed a ready canvas `c-src` owned by [`OWNER`] with one document node
    /// and one memo node.
    pub async fn seed_canvas(&self) {
        let now = Utc::now();

        let doc_key = keys::document_key("d-1");
        self.storage
            .put_object(&doc_key, Bytes::from_static(b"# Notes"), "text/markdown")
            .await
            .unwrap();
        self.store
            .create_document(&Document {
                doc_id: "d-1".into(),
                uid: OWNER.into(),
                title: "Notes".into(),
                canvas_id: Some("c-src".into()),
                project_id: None,
                storage_key: doc_key,
                content_preview: Some("# Notes".into()),
                word_count: 2,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();

        let state = CanvasState {
            version: "000000000000001".into(),
            ..CanvasState::new(
                vec![
                    CanvasNode::new("n-doc", NodeType::Document, "d-1"),
                    CanvasNode::new("n-memo", NodeType::Memo, ""),
                ],
                vec![CanvasEdge::new("e-1", "n-doc", "n-memo")],
            )
        };
        let state_key = keys::canvas_state_key("c-src", &state.version);
        self.storage
            .put_object(
                &state_key,
                Bytes::from(serde_json::to_vec(&state).unwrap()),
                "application/json",
            )
            .await
            .unwrap();
        self.store
            .create_canvas(&Canvas {
                canvas_id: "c-src".into(),
                uid: OWNER.into(),
                title: "Research board".into(),
                status: CANVAS_STATUS_READY.into(),
                version: state.version.clone(),
                state_storage_key: Some(state_key),
                workflow: serde_json::json!({}),
                project_id: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
            .unwrap();
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
