//! Deep copy of a canvas and the entities its nodes reference.

use std::collections::HashSet;

use refly_core::canvas::CanvasState;
use refly_core::error::CoreResult;
use refly_core::ids::gen_canvas_id;
use refly_core::remap::{build_duplication_remap, RemapTable};
use refly_core::rewrite::{rewrite_raw_workflow, rewrite_state, rewrite_variables, RewriteTables};
use refly_core::types::{Entity, EntityType};
use refly_db::models::canvas::{Canvas, CanvasStateUpdate, CANVAS_STATUS_READY};
use refly_db::models::duplicate_record::DuplicateRecord;
use refly_events::bus::CANVAS_DUPLICATED;
use refly_events::{DomainEvent, Job};
use serde::Deserialize;
use validator::Validate;

use super::{discard_canvas, find_owned_canvas, load_state, parse_workflow, write_state};
use crate::context::ServiceContext;
use crate::duplicate::{duplicate_drive_files, duplicate_entities, DuplicateTarget};
use crate::jobs::dispatch;
use crate::quota::check_storage_quota;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCanvasRequest {
    #[validate(length(min = 1))]
    pub canvas_id: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub title: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// When false only the graph is copied; nodes keep pointing at the
    /// source entities.
    #[serde(default = "default_true")]
    pub duplicate_entities: bool,
}

/// Duplicate a canvas owned by `uid`.
///
/// A `creating` placeholder row is written first and removed again if any
/// later step fails. Entities that fail to duplicate do not fail the whole
/// operation: their nodes are dropped from the copy.
pub async fn duplicate_canvas(
    ctx: &ServiceContext,
    uid: &str,
    req: &DuplicateCanvasRequest,
) -> CoreResult<Entity> {
    let source = find_owned_canvas(ctx, uid, &req.canvas_id).await?;
    let mut state = load_state(ctx, &source).await?;
    if req.duplicate_entities {
        check_storage_quota(ctx.store.as_ref(), uid, state.library_node_count()).await?;
    }

    let new_canvas_id = gen_canvas_id();
    let title = req.title.clone().unwrap_or_else(|| source.title.clone());
    let placeholder = Canvas::placeholder(&new_canvas_id, uid, title, req.project_id.clone());
    ctx.store.create_canvas(&placeholder).await?;

    let record = DuplicateRecord::pending(
        uid,
        &source.canvas_id,
        &new_canvas_id,
        EntityType::Canvas.as_str(),
    );
    let failed = match populate(ctx, uid, &source, req, &new_canvas_id, &record, &mut state).await
    {
        Ok(failed) => failed,
        Err(e) => {
            tracing::error!(
                source_canvas_id = %source.canvas_id,
                canvas_id = %new_canvas_id,
                error = %e,
                "Canvas duplication failed, discarding placeholder"
            );
            discard_canvas(ctx, &new_canvas_id, Some(&record.record_id), None).await;
            return Err(e);
        }
    };

    if let Err(e) = dispatch(
        ctx,
        Job::SyncCanvasRelations {
            canvas_id: new_canvas_id.clone(),
        },
    )
    .await
    {
        tracing::warn!(canvas_id = %new_canvas_id, error = %e, "Relation sync not scheduled");
    }

    ctx.publish(
        DomainEvent::new(CANVAS_DUPLICATED)
            .with_entity(EntityType::Canvas.as_str(), &new_canvas_id)
            .with_actor(uid)
            .with_payload(serde_json::json!({
                "sourceCanvasId": source.canvas_id,
                "duplicateEntities": req.duplicate_entities,
                "failedEntities": failed,
            })),
    );
    tracing::info!(
        source_canvas_id = %source.canvas_id,
        canvas_id = %new_canvas_id,
        nodes = state.nodes.len(),
        failed_entities = failed,
        "Canvas duplicated"
    );
    Ok(Entity::new(new_canvas_id, EntityType::Canvas))
}

/// Fill the placeholder. Returns the number of entities that failed to
/// duplicate.
async fn populate(
    ctx: &ServiceContext,
    uid: &str,
    source: &Canvas,
    req: &DuplicateCanvasRequest,
    new_canvas_id: &str,
    record: &DuplicateRecord,
    state: &mut CanvasState,
) -> CoreResult<usize> {
    ctx.store.create_duplicate_record(record).await?;

    // `dropped` holds every source reference the copy must not keep: failed
    // entities plus the IDs and keys of drive files that were not copied.
    let (entities, storage_keys, dropped, failed) = if req.duplicate_entities {
        let mut remap = build_duplication_remap(&state.nodes, &source.canvas_id, new_canvas_id);
        let drive = duplicate_drive_files(ctx, uid, &source.canvas_id, new_canvas_id).await?;
        remap.merge(&drive.files);

        let target = DuplicateTarget {
            uid,
            canvas_id: Some(new_canvas_id),
            project_id: req.project_id.as_deref(),
        };
        let report = duplicate_entities(ctx, &state.entity_refs(), target, &remap).await;
        let failed = report.failed_ids();
        for id in &failed {
            remap.remove(id);
        }
        let dropped: HashSet<String> = failed.union(&drive.failed).cloned().collect();
        (remap, drive.storage_keys, dropped, failed.len())
    } else {
        let remap: RemapTable = [(source.canvas_id.clone(), new_canvas_id.to_string())]
            .into_iter()
            .collect();
        (remap, RemapTable::new(), HashSet::new(), 0)
    };

    let no_toolsets = RemapTable::new();
    let tables = RewriteTables {
        entities: &entities,
        toolsets: &no_toolsets,
        storage_keys: &storage_keys,
    };
    rewrite_state(state, tables, &dropped);
    let workflow = match parse_workflow(source) {
        Some(mut workflow) => {
            rewrite_variables(&mut workflow.variables, tables, &dropped);
            workflow.to_value()
        }
        None => rewrite_raw_workflow(&source.workflow, tables),
    };

    let state_key = write_state(ctx, new_canvas_id, None, state).await?;
    let update = CanvasStateUpdate {
        canvas_id: new_canvas_id.to_string(),
        state_storage_key: state_key.clone(),
        version: state.version.clone(),
        workflow,
        status: CANVAS_STATUS_READY.to_string(),
    };
    if let Err(e) = ctx
        .store
        .finalize_canvas_duplication(&update, &record.record_id)
        .await
    {
        if let Err(cleanup) = ctx.storage.remove_objects(&[state_key]).await {
            tracing::warn!(canvas_id = new_canvas_id, error = %cleanup, "Failed to remove canvas state");
        }
        return Err(e);
    }
    Ok(failed)
}
