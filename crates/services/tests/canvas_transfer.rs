//! Canvas export and import.

mod common;

use assert_matches::assert_matches;
use common::{Fixture, OTHER_UID, UID};
use refly_core::error::CoreError;
use refly_db::Store;
use refly_services::canvas::{export_canvas, import_canvas, ImportCanvasRequest};

fn skill_toolset_id(state: &refly_core::canvas::CanvasState) -> String {
    let skill = state.nodes.iter().find(|n| n.id == "n-skill").unwrap();
    skill.data.metadata.selected_toolsets.as_ref().unwrap()[0].id.clone()
}

async fn import_as(fx: &Fixture, uid: &str, data: serde_json::Value) -> String {
    let req = ImportCanvasRequest {
        data,
        title: None,
        project_id: None,
    };
    import_canvas(&fx.ctx, uid, &req).await.unwrap().entity_id
}

#[tokio::test]
async fn export_import_keeps_graph_and_reuses_known_toolsets() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;

    let export = export_canvas(&fx.ctx, UID, "c-src").await.unwrap();
    assert_eq!(export.toolsets.len(), 1);
    assert_eq!(export.toolsets[0].key, "web_search");

    let canvas_id = import_as(&fx, UID, serde_json::to_value(&export).unwrap()).await;
    let (canvas, state, workflow) = fx.read_state(&canvas_id).await;

    assert_eq!(canvas.title, "Source canvas");
    assert_eq!(canvas.status, "ready");
    assert_eq!(state.nodes.len(), 5);
    assert_eq!(state.edges.len(), 3);
    assert_eq!(workflow.variables.len(), 1);
    assert_eq!(skill_toolset_id(&state), "ts-src");
    assert_eq!(fx.store.list_user_toolsets(UID).await.unwrap().len(), 1);
}

#[tokio::test]
async fn import_maps_toolsets_by_key_for_another_user() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    fx.seed_toolset(OTHER_UID, "ts-mine", "web_search").await;

    let export = export_canvas(&fx.ctx, UID, "c-src").await.unwrap();
    let canvas_id = import_as(&fx, OTHER_UID, serde_json::to_value(&export).unwrap()).await;
    let (canvas, state, _) = fx.read_state(&canvas_id).await;

    assert_eq!(canvas.uid, OTHER_UID);
    assert_eq!(skill_toolset_id(&state), "ts-mine");
    assert_eq!(fx.store.list_user_toolsets(OTHER_UID).await.unwrap().len(), 1);
}

#[tokio::test]
async fn import_creates_missing_toolsets() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;

    let export = export_canvas(&fx.ctx, UID, "c-src").await.unwrap();
    let canvas_id = import_as(&fx, OTHER_UID, serde_json::to_value(&export).unwrap()).await;
    let (_, state, _) = fx.read_state(&canvas_id).await;

    let created = fx.store.list_user_toolsets(OTHER_UID).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].key, "web_search");
    assert_ne!(created[0].toolset_id, "ts-src");
    assert_eq!(skill_toolset_id(&state), created[0].toolset_id);
}

#[tokio::test]
async fn import_without_nodes_creates_nothing() {
    let fx = Fixture::new();
    let req = ImportCanvasRequest {
        data: serde_json::json!({"title": "Broken", "edges": []}),
        title: None,
        project_id: None,
    };

    let err = import_canvas(&fx.ctx, UID, &req).await.unwrap_err();

    assert_matches!(err, CoreError::Params(msg) if msg.contains("nodes"));
    assert!(fx.store.canvases().is_empty());
}

#[tokio::test]
async fn foreign_canvas_cannot_be_exported() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;

    let err = export_canvas(&fx.ctx, OTHER_UID, "c-src").await.unwrap_err();

    assert_matches!(err, CoreError::NotFound { entity: "Canvas", .. });
}
