mod common;

use std::collections::HashSet;

use assert_matches::assert_matches;
use common::{Fixture, OTHER_UID, UID};
use refly_core::error::CoreError;
use refly_core::keys;
use refly_core::share::ShareEntityType;
use refly_core::types::EntityType;
use refly_db::models::share_record::ShareRecord;
use refly_db::Store;
use refly_events::bus::{SHARE_CREATED, SHARE_DELETED};
use refly_services::share::{
    create_share, create_share_for_canvas, create_share_for_resource,
    create_share_for_workflow_app, delete_share, duplicate_share, get_share, CreateShareRequest,
    DuplicateShareRequest, ShareOptions,
};
use refly_storage::ObjectStorage;

fn live_children(shares: &[ShareRecord], parent: &str) -> Vec<ShareRecord> {
    shares
        .iter()
        .filter(|s| s.deleted_at.is_none() && s.parent_share_id.as_deref() == Some(parent))
        .cloned()
        .collect()
}

fn duplicate_request(share_id: &str) -> DuplicateShareRequest {
    DuplicateShareRequest {
        share_id: share_id.into(),
        project_id: None,
        title: None,
    }
}

#[tokio::test]
async fn sharing_a_canvas_twice_reuses_records() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;

    let first = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    let second = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();

    assert_eq!(first.share_id, second.share_id);
    assert!(first.share_id.starts_with("can-"));
    let shares = fx.store.shares();
    assert_eq!(shares.iter().filter(|s| s.entity_type == "canvas").count(), 1);
    assert_eq!(live_children(&shares, &first.share_id).len(), 4);
    assert_eq!(shares.len(), 5);
}

#[tokio::test]
async fn resharing_removes_replaced_file_copies() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;

    let record = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    let prefix = format!("share/{}/files/", record.share_id);
    let before: Vec<String> = fx.storage.keys().into_iter().filter(|k| k.starts_with(&prefix)).collect();
    assert_eq!(before.len(), 1);

    create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    let after: Vec<String> = fx.storage.keys().into_iter().filter(|k| k.starts_with(&prefix)).collect();
    assert_eq!(after.len(), 1);
    assert_ne!(before, after);
}

#[tokio::test]
async fn canvas_blob_carries_share_ids_only() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;

    let record = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    let view = get_share(&fx.ctx, &record.share_id).await.unwrap();
    let text = view.content.to_string();
    for raw in ["\"d-1\"", "\"r-1\"", "\"ca-1\"", "\"ar-1\"", "\"df-1\"", "c-src"] {
        assert!(!text.contains(raw), "blob still contains {raw}");
    }

    let nodes = view.content["nodes"].as_array().unwrap();
    let doc = nodes.iter().find(|n| n["id"] == "n-doc").unwrap();
    let child_id = doc["data"]["entityId"].as_str().unwrap();
    assert!(child_id.starts_with("doc-"));
    assert_eq!(doc["data"]["metadata"]["shareId"], child_id);

    let child = get_share(&fx.ctx, child_id).await.unwrap();
    assert_eq!(child.record.parent_share_id.as_deref(), Some(record.share_id.as_str()));
    assert_eq!(child.content["content"], "hello world from d-1");

    let file_id = view.content["files"][0]["fileId"].as_str().unwrap();
    assert!(file_id.starts_with("dfs-"));
    assert_eq!(
        view.content["variables"][0]["value"][0]["resource"]["fileId"],
        file_id
    );
}

#[tokio::test]
async fn canvas_blob_omits_files_that_could_not_be_copied() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    let file_key = keys::drive_file_key(UID, "c-src", "df-1", "data.csv");
    fx.storage.remove_objects(&[file_key.clone()]).await.unwrap();

    let record = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    let view = get_share(&fx.ctx, &record.share_id).await.unwrap();
    let text = view.content.to_string();

    assert!(!text.contains(&file_key));
    assert!(!text.contains("\"df-1\""));
    assert_eq!(view.content["files"].as_array().map(Vec::len), Some(0));
    assert_eq!(view.content["variables"][0]["value"], serde_json::json!([]));
}

#[tokio::test]
async fn resource_share_copies_raw_upload() {
    let fx = Fixture::new();
    fx.seed_resource("r-1", "text").await;

    let record = create_share_for_resource(&fx.ctx, UID, "r-1", ShareOptions::default())
        .await
        .unwrap();
    let view = get_share(&fx.ctx, &record.share_id).await.unwrap();
    let raw = view.content["rawFileKey"].as_str().unwrap();
    assert_eq!(raw, format!("share/{}/raw/paper.pdf", record.share_id));
    assert!(fx.storage.contains(raw));
}

#[tokio::test]
async fn delete_cascades_to_children_and_objects() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    let mut events = fx.ctx.events.subscribe();

    let record = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    assert_eq!(events.try_recv().unwrap().event_type, SHARE_CREATED);

    let deleted = delete_share(&fx.ctx, UID, &record.share_id).await.unwrap();
    assert_eq!(deleted, 5);
    assert_eq!(events.try_recv().unwrap().event_type, SHARE_DELETED);

    assert_matches!(
        get_share(&fx.ctx, &record.share_id).await,
        Err(CoreError::NotFound { entity: "Share", .. })
    );
    assert!(fx.storage.keys().iter().all(|k| !k.starts_with("share/")));
    assert!(fx.store.shares().iter().all(|s| s.deleted_at.is_some()));
}

#[tokio::test]
async fn only_owner_can_delete() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    let record = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();

    assert_matches!(
        delete_share(&fx.ctx, OTHER_UID, &record.share_id).await,
        Err(CoreError::NotFound { .. })
    );
    assert!(get_share(&fx.ctx, &record.share_id).await.is_ok());
}

#[tokio::test]
async fn workflow_app_template_is_independent() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    fx.seed_workflow_app("wa-1", "c-src").await;

    let shares = create_share_for_workflow_app(&fx.ctx, UID, "wa-1", true)
        .await
        .unwrap();
    let template = shares.template_share.clone().unwrap();
    assert_eq!(
        ShareEntityType::from_share_id(&shares.share.share_id),
        Some(ShareEntityType::WorkflowApp)
    );
    assert_eq!(
        ShareEntityType::from_share_id(&template.share_id),
        Some(ShareEntityType::WorkflowAppTemplate)
    );

    let all = fx.store.shares();
    let app_children = live_children(&all, &shares.share.share_id);
    let template_children = live_children(&all, &template.share_id);
    assert_eq!(app_children.len(), 4);
    assert_eq!(template_children.len(), 4);
    let app_keys: HashSet<&str> = app_children.iter().map(|s| s.storage_key.as_str()).collect();
    assert!(template_children
        .iter()
        .all(|s| !app_keys.contains(s.storage_key.as_str())));
    assert_ne!(shares.share.storage_key, template.storage_key);

    let app = fx.store.find_workflow_app("wa-1").await.unwrap().unwrap();
    assert_eq!(app.share_id.as_deref(), Some(shares.share.share_id.as_str()));
    assert_eq!(app.template_share_id.as_deref(), Some(template.share_id.as_str()));

    delete_share(&fx.ctx, UID, &shares.share.share_id).await.unwrap();
    let view = get_share(&fx.ctx, &template.share_id).await.unwrap();
    let file_key = view.content["canvas"]["files"][0]["storageKey"].as_str().unwrap();
    assert!(fx.storage.contains(file_key));
    for child in &template_children {
        assert!(get_share(&fx.ctx, &child.share_id).await.is_ok());
    }
}

#[tokio::test]
async fn share_without_duplication_rejects_copies() {
    let fx = Fixture::new();
    fx.seed_document("d-1", "private notes").await;
    let record = create_share(
        &fx.ctx,
        UID,
        &CreateShareRequest {
            entity_type: "document".into(),
            entity_id: "d-1".into(),
            title: None,
            allow_duplication: Some(false),
            parent_share_id: None,
        },
    )
    .await
    .unwrap();

    assert_matches!(
        duplicate_share(&fx.ctx, OTHER_UID, &duplicate_request(&record.share_id)).await,
        Err(CoreError::DuplicationNotAllowed { share_id }) if share_id == record.share_id
    );
    assert_eq!(fx.store.documents().len(), 1);
}

#[tokio::test]
async fn document_share_duplicates_for_another_user() {
    let fx = Fixture::new();
    fx.seed_document("d-1", "shared words").await;
    let record = create_share(
        &fx.ctx,
        UID,
        &CreateShareRequest {
            entity_type: "document".into(),
            entity_id: "d-1".into(),
            title: Some("Public".into()),
            allow_duplication: None,
            parent_share_id: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(record.title, "Public");

    let entity = duplicate_share(&fx.ctx, OTHER_UID, &duplicate_request(&record.share_id))
        .await
        .unwrap();
    assert_eq!(entity.entity_type, EntityType::Document);

    let doc = fx.store.find_document(&entity.entity_id).await.unwrap().unwrap();
    assert_eq!(doc.uid, OTHER_UID);
    assert_eq!(doc.word_count, 2);
    assert_eq!(fx.read_text(&doc.storage_key).await, "shared words");
    assert_eq!(fx.search.get(&entity.entity_id).unwrap().uid, OTHER_UID);
    assert_eq!(
        fx.store.get_storage_usage(OTHER_UID).await.unwrap().object_count,
        1
    );
}

#[tokio::test]
async fn canvas_share_rebuilds_a_private_canvas() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    let record = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    let child_ids: HashSet<String> = live_children(&fx.store.shares(), &record.share_id)
        .into_iter()
        .map(|s| s.share_id)
        .collect();

    let entity = duplicate_share(
        &fx.ctx,
        OTHER_UID,
        &DuplicateShareRequest {
            share_id: record.share_id.clone(),
            project_id: Some("p-9".into()),
            title: Some("Remix".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(entity.entity_type, EntityType::Canvas);

    let (canvas, state, workflow) = fx.read_state(&entity.entity_id).await;
    assert_eq!(canvas.uid, OTHER_UID);
    assert_eq!(canvas.title, "Remix");
    assert_eq!(state.nodes.len(), 5);
    assert_eq!(state.edges.len(), 3);
    for node in &state.nodes {
        assert!(!child_ids.contains(&node.data.entity_id));
        assert!(node.data.metadata.share_id.is_none());
    }

    let doc_id = &state.nodes.iter().find(|n| n.id == "n-doc").unwrap().data.entity_id;
    let doc = fx.store.find_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.uid, OTHER_UID);
    assert_eq!(doc.canvas_id.as_deref(), Some(entity.entity_id.as_str()));
    assert_eq!(doc.project_id.as_deref(), Some("p-9"));

    let result_id = &state.nodes.iter().find(|n| n.id == "n-skill").unwrap().data.entity_id;
    let calls = fx.store.list_tool_calls(result_id, 0).await.unwrap();
    assert_eq!(calls.len(), 2);

    let files = fx.store.list_drive_files(&entity.entity_id).await.unwrap();
    assert_eq!(files.len(), 1);
    let resource = workflow.variables[0].value[0].resource.as_ref().unwrap();
    assert_eq!(resource.file_id.as_deref(), Some(files[0].file_id.as_str()));
    assert_eq!(resource.storage_key.as_deref(), Some(files[0].storage_key.as_str()));
}

#[tokio::test]
async fn template_share_duplicates_into_canvas() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    fx.seed_workflow_app("wa-1", "c-src").await;
    let shares = create_share_for_workflow_app(&fx.ctx, UID, "wa-1", true)
        .await
        .unwrap();
    let template = shares.template_share.unwrap();

    let entity = duplicate_share(&fx.ctx, OTHER_UID, &duplicate_request(&template.share_id))
        .await
        .unwrap();
    let (canvas, state, _) = fx.read_state(&entity.entity_id).await;
    assert_eq!(canvas.title, "Source canvas");
    assert_eq!(state.nodes.len(), 5);
}

#[tokio::test]
async fn canvas_share_duplication_respects_quota() {
    let fx = Fixture::new();
    fx.seed_standard_canvas().await;
    let record = create_share_for_canvas(&fx.ctx, UID, "c-src", ShareOptions::default())
        .await
        .unwrap();
    fx.store.set_usage(OTHER_UID, 9, 10);

    assert_matches!(
        duplicate_share(&fx.ctx, OTHER_UID, &duplicate_request(&record.share_id)).await,
        Err(CoreError::StorageQuotaExceeded { needed: 3, available: 1 })
    );
    assert!(fx.store.canvases().iter().all(|c| c.uid == UID));
}

#[tokio::test]
async fn unknown_share_type_is_rejected() {
    let fx = Fixture::new();
    let err = create_share(
        &fx.ctx,
        UID,
        &CreateShareRequest {
            entity_type: "spreadsheet".into(),
            entity_id: "x-1".into(),
            title: None,
            allow_duplication: None,
            parent_share_id: None,
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, CoreError::Params(_));
}
