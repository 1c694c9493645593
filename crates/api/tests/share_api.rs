//! HTTP tests for the share endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, OWNER, VISITOR};
use refly_db::Store;
use serde_json::json;

async fn share_canvas(app: &common::TestApp, allow_duplication: bool) -> String {
    let response = app
        .post(
            "/v1/share/create",
            Some(OWNER),
            json!({
                "entityType": "canvas",
                "entityId": "c-src",
                "allowDuplication": allow_duplication,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["shareId"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn shared_canvas_is_publicly_readable() {
    let app = build_test_app();
    app.seed_canvas().await;
    let share_id = share_canvas(&app, true).await;
    assert!(share_id.starts_with("can-"));

    let response = app.get(&format!("/v1/share/{share_id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["record"]["entityId"], "c-src");
    let nodes = json["data"]["content"]["nodes"].as_array().unwrap();
    let doc_node = nodes.iter().find(|n| n["id"] == "n-doc").unwrap();
    let child_share = doc_node["data"]["entityId"].as_str().unwrap();
    assert!(child_share.starts_with("doc-"));
}

#[tokio::test]
async fn sharing_twice_returns_the_same_share() {
    let app = build_test_app();
    app.seed_canvas().await;

    let first = share_canvas(&app, true).await;
    let second = share_canvas(&app, true).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn visitor_duplicates_a_shared_canvas() {
    let app = build_test_app();
    app.seed_canvas().await;
    let share_id = share_canvas(&app, true).await;

    let response = app
        .post("/v1/share/duplicate", Some(VISITOR), json!({"shareId": share_id}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["entityType"], "canvas");
    let canvas_id = json["data"]["entityId"].as_str().unwrap();
    let copy = app.store.find_canvas(canvas_id).await.unwrap().unwrap();
    assert_eq!(copy.uid, VISITOR);
}

#[tokio::test]
async fn duplication_disabled_is_forbidden() {
    let app = build_test_app();
    app.seed_canvas().await;
    let share_id = share_canvas(&app, false).await;

    let response = app
        .post("/v1/share/duplicate", Some(VISITOR), json!({"shareId": share_id}))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "DUPLICATION_NOT_ALLOWED");
}

#[tokio::test]
async fn only_the_owner_deletes_a_share() {
    let app = build_test_app();
    app.seed_canvas().await;
    let share_id = share_canvas(&app, true).await;

    let response = app
        .post("/v1/share/delete", Some(VISITOR), json!({"shareId": share_id}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .post("/v1/share/delete", Some(OWNER), json!({"shareId": share_id}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    // The canvas share plus the document child share.
    assert_eq!(body_json(response).await["data"]["deleted"], 2);

    let response = app.get(&format!("/v1/share/{share_id}"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_share_type_is_a_params_error() {
    let app = build_test_app();
    let response = app
        .post(
            "/v1/share/create",
            Some(OWNER),
            json!({"entityType": "spreadsheet", "entityId": "x-1"}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "PARAMS_ERROR");
}

#[tokio::test]
async fn share_routes_other_than_get_require_auth() {
    let app = build_test_app();
    let response = app
        .post("/v1/share/delete", None, json!({"shareId": "can-1"}))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
