//! Canvas and workflow app shares: the share cascade.
//!
//! Drive files are copied under the share first, then every entity node
//! becomes a child share, and finally the graph is rewritten so that node
//! entity IDs are the child share IDs.

use std::collections::HashSet;

use refly_core::canvas::CanvasState;
use refly_core::error::{CoreError, CoreResult};
use refly_core::keys;
use refly_core::remap::RemapTable;
use refly_core::rewrite::{rewrite_state, rewrite_variables, RewriteTables};
use refly_core::share::{gen_share_id, ShareEntityType};
use refly_core::types::EntityType;
use refly_db::models::canvas::Canvas;
use refly_db::models::drive_file::DriveFile;
use refly_db::models::share_record::ShareRecord;
use refly_db::models::workflow_app::WorkflowApp;
use serde::Serialize;

use super::content::{SharedCanvas, SharedDriveFile, SharedWorkflowApp};
use super::{share_entity, upsert_share, ShareOptions};
use crate::canvas::{find_owned_canvas, load_state, parse_workflow};
use crate::context::ServiceContext;
use crate::limit::run_bounded;

/// Shares produced for a workflow app.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAppShares {
    pub share: ShareRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_share: Option<ShareRecord>,
}

#[derive(Default)]
struct SharedFiles {
    files: Vec<SharedDriveFile>,
    ids: RemapTable,
    storage_keys: RemapTable,
    /// IDs and storage keys of files that could not be copied.
    failed: HashSet<String>,
}

async fn share_drive_files(
    ctx: &ServiceContext,
    canvas_id: &str,
    share_id: &str,
) -> CoreResult<SharedFiles> {
    let files = ctx.store.list_drive_files(canvas_id).await?;
    let copies = run_bounded(
        ctx.config.drive_file_concurrency,
        files.iter().map(|file: &DriveFile| async move {
            let file_id = gen_share_id(ShareEntityType::DriveFile);
            let key = keys::share_file_key(share_id, &file_id, &file.name);
            let copied = ctx.storage.duplicate_file(&file.storage_key, &key).await;
            (file, file_id, key, copied)
        }),
    )
    .await;

    let mut shared = SharedFiles::default();
    for (file, file_id, key, copied) in copies {
        if let Err(e) = copied {
            tracing::warn!(share_id, file_id = %file.file_id, error = %e, "Drive file not shared");
            shared.failed.insert(file.file_id.clone());
            shared.failed.insert(file.storage_key.clone());
            continue;
        }
        shared.ids.insert(file.file_id.clone(), file_id.clone());
        shared.storage_keys.insert(file.storage_key.clone(), key.clone());
        shared.files.push(SharedDriveFile {
            file_id,
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size,
            source: file.source.clone(),
            storage_key: key,
        });
    }
    Ok(shared)
}

/// Child share IDs keyed by entity ID, plus the entities that failed.
struct ChildShares {
    shares: RemapTable,
    failed: HashSet<String>,
}

fn is_child_shareable(entity_type: EntityType) -> bool {
    matches!(
        entity_type,
        EntityType::Document | EntityType::Resource | EntityType::CodeArtifact | EntityType::SkillResponse
    )
}

async fn share_children(
    ctx: &ServiceContext,
    uid: &str,
    state: &CanvasState,
    parent_share_id: &str,
    allow_duplication: bool,
) -> ChildShares {
    let refs = state.entity_refs();
    let opts = ShareOptions {
        title: None,
        parent_share_id: Some(parent_share_id),
        allow_duplication,
    };
    let results = run_bounded(
        ctx.config.share_concurrency,
        refs.iter()
            .filter(|(entity_type, _)| is_child_shareable(*entity_type))
            .map(|(entity_type, entity_id)| async move {
                let shared = share_entity(ctx, uid, *entity_type, entity_id, opts).await;
                (entity_type, entity_id, shared)
            }),
    )
    .await;

    let mut children = ChildShares {
        shares: RemapTable::new(),
        failed: HashSet::new(),
    };
    for (entity_type, entity_id, shared) in results {
        match shared {
            Ok(record) => {
                children.shares.insert(entity_id.clone(), record.share_id);
            }
            Err(e) => {
                tracing::warn!(
                    parent_share_id,
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    error = %e,
                    "Child share failed, node dropped"
                );
                children.failed.insert(entity_id.clone());
            }
        }
    }
    children
}

/// Build the public form of `canvas` under `share_id`.
async fn build_shared_canvas(
    ctx: &ServiceContext,
    uid: &str,
    canvas: &Canvas,
    share_id: &str,
    allow_duplication: bool,
) -> CoreResult<SharedCanvas> {
    let mut state = load_state(ctx, canvas).await?;
    let mut variables = parse_workflow(canvas)
        .map(|workflow| workflow.variables)
        .unwrap_or_default();

    let files = share_drive_files(ctx, &canvas.canvas_id, share_id).await?;
    let children = share_children(ctx, uid, &state, share_id, allow_duplication).await;

    let mut remap = children.shares.clone();
    remap.merge(&files.ids);
    remap.insert(canvas.canvas_id.clone(), share_id);
    let empty = RemapTable::new();
    let tables = RewriteTables {
        entities: &remap,
        toolsets: &empty,
        storage_keys: &files.storage_keys,
    };
    let dropped: HashSet<String> = children.failed.union(&files.failed).cloned().collect();
    rewrite_state(&mut state, tables, &dropped);
    rewrite_variables(&mut variables, tables, &dropped);

    let child_ids: HashSet<&str> = children.shares.new_ids().collect();
    for node in state.nodes.iter_mut() {
        if child_ids.contains(node.data.entity_id.as_str()) {
            node.data.metadata.share_id = Some(node.data.entity_id.clone());
        }
    }

    tracing::debug!(
        share_id,
        children = children.shares.len(),
        failed = children.failed.len(),
        files = files.files.len(),
        "Canvas share built"
    );
    Ok(SharedCanvas {
        title: canvas.title.clone(),
        nodes: state.nodes,
        edges: state.edges,
        variables,
        files: files.files,
    })
}

/// Share a canvas owned by `uid`. Sharing again reuses the share ID and the
/// child shares.
pub async fn create_share_for_canvas(
    ctx: &ServiceContext,
    uid: &str,
    canvas_id: &str,
    opts: ShareOptions<'_>,
) -> CoreResult<ShareRecord> {
    let canvas = find_owned_canvas(ctx, uid, canvas_id).await?;
    let title = opts
        .title
        .map_or_else(|| canvas.title.clone(), str::to_string);
    let canvas = &canvas;

    let record = upsert_share(ctx, uid, canvas_id, ShareEntityType::Canvas, title, opts, move |share_id| async move {
        let shared = build_shared_canvas(ctx, uid, canvas, &share_id, opts.allow_duplication).await?;
        Ok(serde_json::to_value(shared)?)
    })
    .await?;
    tracing::info!(canvas_id, share_id = %record.share_id, "Canvas shared");
    Ok(record)
}

async fn share_workflow_app(
    ctx: &ServiceContext,
    uid: &str,
    app: &WorkflowApp,
    canvas: &Canvas,
    share_type: ShareEntityType,
) -> CoreResult<ShareRecord> {
    upsert_share(
        ctx,
        uid,
        &app.app_id,
        share_type,
        app.title.clone(),
        ShareOptions::default(),
        move |share_id| async move {
            let canvas = build_shared_canvas(ctx, uid, canvas, &share_id, true).await?;
            Ok(serde_json::to_value(SharedWorkflowApp {
                title: app.title.clone(),
                description: app.description.clone(),
                canvas,
            })?)
        },
    )
    .await
}

/// Share a workflow app. Publishing to the community also builds a template
/// share: the same cascade under a second share ID with its own child shares
/// and file copies.
pub async fn create_share_for_workflow_app(
    ctx: &ServiceContext,
    uid: &str,
    app_id: &str,
    publish_to_community: bool,
) -> CoreResult<WorkflowAppShares> {
    let app = ctx
        .store
        .find_workflow_app(app_id)
        .await?
        .filter(|a| a.uid == uid && a.deleted_at.is_none())
        .ok_or_else(|| CoreError::not_found("WorkflowApp", app_id))?;
    let canvas = find_owned_canvas(ctx, uid, &app.canvas_id).await?;

    let share = share_workflow_app(ctx, uid, &app, &canvas, ShareEntityType::WorkflowApp).await?;
    let template_share = if publish_to_community {
        Some(share_workflow_app(ctx, uid, &app, &canvas, ShareEntityType::WorkflowAppTemplate).await?)
    } else {
        None
    };

    let template_id = template_share
        .as_ref()
        .map(|t| t.share_id.as_str())
        .or(app.template_share_id.as_deref());
    ctx.store
        .update_workflow_app_shares(app_id, &share.share_id, template_id)
        .await?;

    tracing::info!(
        app_id,
        share_id = %share.share_id,
        template_share_id = ?template_id,
        "Workflow app shared"
    );
    Ok(WorkflowAppShares {
        share,
        template_share,
    })
}
