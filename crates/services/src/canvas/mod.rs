//! Canvas operations: duplication, export/import, state reads and the
//! canvas → entity relation index.

pub mod duplicate;
pub mod transfer;

use bytes::Bytes;
use refly_core::canvas::{next_version, CanvasState};
use refly_core::error::{CoreError, CoreResult};
use refly_core::keys;
use refly_core::store::canvas_relation_lock_key;
use refly_core::workflow::Workflow;
use refly_db::models::canvas::{Canvas, CanvasEntityRelation};
use refly_db::models::duplicate_record::DUPLICATE_STATUS_FAILED;

use crate::context::ServiceContext;

pub use duplicate::{duplicate_canvas, DuplicateCanvasRequest};
pub use transfer::{export_canvas, import_canvas, CanvasExport, ExportedToolset, ImportCanvasRequest};

/// Load a live canvas owned by `uid`. Someone else's canvas reads as missing.
pub(crate) async fn find_owned_canvas(
    ctx: &ServiceContext,
    uid: &str,
    canvas_id: &str,
) -> CoreResult<Canvas> {
    ctx.store
        .find_canvas(canvas_id)
        .await?
        .filter(|c| c.uid == uid)
        .ok_or_else(|| CoreError::not_found("Canvas", canvas_id))
}

/// Read the stored state of a canvas. A canvas that never saved a state has
/// an empty graph.
pub(crate) async fn load_state(ctx: &ServiceContext, canvas: &Canvas) -> CoreResult<CanvasState> {
    let Some(key) = canvas.state_storage_key.as_deref() else {
        return Ok(CanvasState::default());
    };
    let body = ctx.storage.get_object(key).await?;
    let mut state: CanvasState = serde_json::from_slice(&body)?;
    if state.version.is_empty() {
        state.version = canvas.version.clone();
    }
    Ok(state)
}

/// The typed workflow of a canvas, or `None` when the stored blob does not
/// fit that shape.
pub(crate) fn parse_workflow(canvas: &Canvas) -> Option<Workflow> {
    match Workflow::from_value(&canvas.workflow) {
        Ok(workflow) => Some(workflow),
        Err(e) => {
            tracing::warn!(
                canvas_id = %canvas.canvas_id,
                error = %e,
                "Canvas workflow does not match the typed shape"
            );
            None
        }
    }
}

/// Stamp `state` with the next version and upload it. Returns the object key.
pub(crate) async fn write_state(
    ctx: &ServiceContext,
    canvas_id: &str,
    previous_version: Option<&str>,
    state: &mut CanvasState,
) -> CoreResult<String> {
    state.version = next_version(previous_version);
    let key = keys::canvas_state_key(canvas_id, &state.version);
    let body = serde_json::to_vec(state)?;
    ctx.storage
        .put_object(&key, Bytes::from(body), "application/json")
        .await?;
    Ok(key)
}

/// Undo a half-built canvas: drop the row, the uploaded state and mark the
/// duplicate record failed. Every step is best effort.
pub(crate) async fn discard_canvas(
    ctx: &ServiceContext,
    canvas_id: &str,
    record_id: Option<&str>,
    state_key: Option<&str>,
) {
    if let Err(e) = ctx.store.delete_canvas(canvas_id).await {
        tracing::error!(canvas_id, error = %e, "Failed to delete placeholder canvas");
    }
    if let Some(key) = state_key {
        if let Err(e) = ctx.storage.remove_objects(&[key.to_string()]).await {
            tracing::warn!(canvas_id, key, error = %e, "Failed to remove orphaned canvas state");
        }
    }
    if let Some(record_id) = record_id {
        if let Err(e) = ctx
            .store
            .update_duplicate_record_status(record_id, DUPLICATE_STATUS_FAILED)
            .await
        {
            tracing::warn!(record_id, error = %e, "Failed to mark duplicate record failed");
        }
    }
}

pub async fn get_canvas_state(
    ctx: &ServiceContext,
    uid: &str,
    canvas_id: &str,
) -> CoreResult<CanvasState> {
    let canvas = find_owned_canvas(ctx, uid, canvas_id).await?;
    load_state(ctx, &canvas).await
}

/// Recompute the relation rows of a canvas from its current nodes.
///
/// Returns `false` without touching anything when another sync of the same
/// canvas holds the lock, or when the canvas no longer exists.
pub async fn sync_canvas_entity_relations(ctx: &ServiceContext, canvas_id: &str) -> CoreResult<bool> {
    let key = canvas_relation_lock_key(canvas_id);
    let Some(guard) = ctx.locks.try_lock(&key).await? else {
        tracing::warn!(canvas_id, "Relation sync already running, skipping");
        return Ok(false);
    };

    let synced = sync_relations_locked(ctx, canvas_id).await;
    if let Err(e) = guard.release().await {
        tracing::warn!(canvas_id, error = %e, "Failed to release relation lock");
    }
    synced
}

async fn sync_relations_locked(ctx: &ServiceContext, canvas_id: &str) -> CoreResult<bool> {
    let Some(canvas) = ctx.store.find_canvas(canvas_id).await? else {
        tracing::debug!(canvas_id, "Canvas gone, relation sync skipped");
        return Ok(false);
    };
    let state = load_state(ctx, &canvas).await?;
    let relations: Vec<CanvasEntityRelation> = state
        .entity_refs()
        .into_iter()
        .map(|(entity_type, entity_id)| CanvasEntityRelation {
            canvas_id: canvas_id.to_string(),
            entity_id,
            entity_type: entity_type.as_str().to_string(),
        })
        .collect();
    ctx.store
        .replace_canvas_relations(canvas_id, &relations)
        .await?;
    tracing::debug!(canvas_id, relations = relations.len(), "Canvas relations synced");
    Ok(true)
}
