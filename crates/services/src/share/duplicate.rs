//! Private copies made from a share.
//!
//! Library entities and skill responses are materialized from their blobs.
//! Canvas and workflow app shares rebuild a whole canvas: every child share a
//! node points at becomes a new entity, shared file copies become drive
//! files of the new canvas, and the graph is rewritten from child share IDs
//! to the new entity IDs.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use chrono::Utc;
use refly_core::canvas::CanvasState;
use refly_core::error::{CoreError, CoreResult};
use refly_core::ids::{gen_canvas_id, gen_drive_file_id, gen_entity_id};
use refly_core::keys;
use refly_core::remap::RemapTable;
use refly_core::rewrite::{rewrite_state, rewrite_variables, RewriteTables};
use refly_core::share::ShareEntityType;
use refly_core::store::SearchDocument;
use refly_core::types::{Entity, EntityType};
use refly_core::workflow::{Workflow, WorkflowVariable};
use refly_db::models::canvas::{Canvas, CanvasStateUpdate, CANVAS_STATUS_READY};
use refly_db::models::code_artifact::CodeArtifact;
use refly_db::models::document::Document;
use refly_db::models::drive_file::DriveFile;
use refly_db::models::duplicate_record::DuplicateRecord;
use refly_db::models::resource::Resource;
use refly_db::models::share_record::ShareRecord;
use refly_events::bus::SHARE_DUPLICATED;
use refly_events::{DomainEvent, Job};
use serde::Deserialize;
use validator::Validate;

use super::content::{
    SharedCanvas, SharedCodeArtifact, SharedDocument, SharedDriveFile, SharedResource,
    SharedSkillResponse, SharedWorkflowApp,
};
use super::load_content;
use crate::canvas::{discard_canvas, write_state};
use crate::context::ServiceContext;
use crate::duplicate::entities::{copy_action_result, tracked};
use crate::duplicate::{DriveFileRemap, DuplicateTarget};
use crate::jobs::dispatch;
use crate::limit::run_bounded;
use crate::quota::check_storage_quota;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateShareRequest {
    #[validate(length(min = 1))]
    pub share_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub title: Option<String>,
}

/// Create a private copy of a share for `uid`.
///
/// Fails with `DuplicationNotAllowed` when the owner disabled duplication.
pub async fn duplicate_share(
    ctx: &ServiceContext,
    uid: &str,
    req: &DuplicateShareRequest,
) -> CoreResult<Entity> {
    let record = ctx
        .store
        .find_share(&req.share_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Share", &req.share_id))?;
    if !record.allow_duplication {
        return Err(CoreError::DuplicationNotAllowed {
            share_id: record.share_id,
        });
    }
    let share_type = share_type_of(&record)?;
    let content = load_content(ctx, &record).await?;

    let entity = match share_type {
        ShareEntityType::Canvas => {
            let shared: SharedCanvas = serde_json::from_value(content)?;
            duplicate_shared_canvas(ctx, uid, &record, shared, req).await?
        }
        ShareEntityType::WorkflowApp | ShareEntityType::WorkflowAppTemplate => {
            let app: SharedWorkflowApp = serde_json::from_value(content)?;
            duplicate_shared_canvas(ctx, uid, &record, app.canvas, req).await?
        }
        ShareEntityType::DriveFile => {
            return Err(CoreError::Params(
                "drive file shares are duplicated with their canvas".to_string(),
            ));
        }
        other => {
            let entity_type = other.entity_type();
            let new_id = gen_entity_id(entity_type);
            let target = DuplicateTarget {
                uid,
                canvas_id: None,
                project_id: req.project_id.as_deref(),
            };
            materialize(
                ctx,
                &record,
                other,
                &content,
                &new_id,
                target,
                req.title.as_deref(),
                &RemapTable::new(),
            )
            .await?;
            Entity::new(new_id, entity_type)
        }
    };

    ctx.publish(
        DomainEvent::new(SHARE_DUPLICATED)
            .with_entity(record.entity_type.clone(), &record.share_id)
            .with_actor(uid)
            .with_payload(serde_json::json!({
                "entityId": entity.entity_id,
                "entityType": entity.entity_type,
            })),
    );
    tracing::info!(
        share_id = %record.share_id,
        entity_id = %entity.entity_id,
        entity_type = %entity.entity_type,
        "Share duplicated"
    );
    Ok(entity)
}

fn share_type_of(record: &ShareRecord) -> CoreResult<ShareEntityType> {
    ShareEntityType::from_name(&record.entity_type).ok_or_else(|| {
        CoreError::Internal(format!(
            "share {} has unknown entity type {}",
            record.share_id, record.entity_type
        ))
    })
}

// ---------------------------------------------------------------------------
// Single entities
// ---------------------------------------------------------------------------

/// Create entity `new_id` from the blob of `record`.
///
/// References inside skill response blobs are rewritten through `remap`.
#[allow(clippy::too_many_arguments)]
async fn materialize(
    ctx: &ServiceContext,
    record: &ShareRecord,
    share_type: ShareEntityType,
    content: &serde_json::Value,
    new_id: &str,
    target: DuplicateTarget<'_>,
    title: Option<&str>,
    remap: &RemapTable,
) -> CoreResult<()> {
    let entity_type = share_type.entity_type();
    tracked(ctx, entity_type, &record.share_id, new_id, target.uid, async {
        match share_type {
            ShareEntityType::Document => {
                let shared: SharedDocument = serde_json::from_value(content.clone())?;
                materialize_document(ctx, shared, new_id, target, title).await
            }
            ShareEntityType::Resource => {
                let shared: SharedResource = serde_json::from_value(content.clone())?;
                materialize_resource(ctx, shared, new_id, target, title).await
            }
            ShareEntityType::CodeArtifact => {
                let shared: SharedCodeArtifact = serde_json::from_value(content.clone())?;
                materialize_code_artifact(ctx, shared, new_id, target, title).await
            }
            ShareEntityType::SkillResponse => {
                let shared: SharedSkillResponse = serde_json::from_value(content.clone())?;
                materialize_skill_response(ctx, shared, new_id, target, title, remap).await
            }
            other => Err(CoreError::Params(format!(
                "{other} shares are not materialized individually"
            ))),
        }
    })
    .await
}

async fn materialize_document(
    ctx: &ServiceContext,
    shared: SharedDocument,
    new_id: &str,
    target: DuplicateTarget<'_>,
    title: Option<&str>,
) -> CoreResult<()> {
    check_storage_quota(ctx.store.as_ref(), target.uid, 1).await?;
    let storage_key = keys::document_key(new_id);
    ctx.storage
        .put_object(&storage_key, Bytes::from(shared.content.clone()), "text/plain")
        .await?;

    let title = title.map_or(shared.title, str::to_string);
    let now = Utc::now();
    ctx.store
        .create_document(&Document {
            doc_id: new_id.to_string(),
            uid: target.uid.to_string(),
            title: title.clone(),
            canvas_id: target.canvas_id.map(str::to_string),
            project_id: target.project_id.map(str::to_string),
            storage_key,
            content_preview: shared.content_preview,
            word_count: shared.content.split_whitespace().count() as i32,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await?;
    ctx.search
        .upsert_document(SearchDocument {
            id: new_id.to_string(),
            uid: target.uid.to_string(),
            entity_type: EntityType::Document.as_str().to_string(),
            title,
            content: shared.content,
        })
        .await?;
    ctx.store.increment_object_count(target.uid, 1).await
}

async fn materialize_resource(
    ctx: &ServiceContext,
    shared: SharedResource,
    new_id: &str,
    target: DuplicateTarget<'_>,
    title: Option<&str>,
) -> CoreResult<()> {
    check_storage_quota(ctx.store.as_ref(), target.uid, 1).await?;
    let storage_key = match shared.content.as_ref() {
        Some(text) => {
            let key = keys::resource_key(new_id);
            ctx.storage
                .put_object(&key, Bytes::from(text.clone()), "text/plain")
                .await?;
            Some(key)
        }
        None => None,
    };
    let raw_file_key = match shared.raw_file_key.as_deref() {
        Some(src) => {
            let key = keys::resource_raw_key(new_id, src);
            ctx.storage.duplicate_file(src, &key).await?;
            Some(key)
        }
        None => None,
    };

    let title = title.map_or(shared.title, str::to_string);
    let now = Utc::now();
    ctx.store
        .create_resource(&Resource {
            resource_id: new_id.to_string(),
            uid: target.uid.to_string(),
            title: title.clone(),
            resource_type: shared.resource_type,
            canvas_id: target.canvas_id.map(str::to_string),
            project_id: target.project_id.map(str::to_string),
            storage_key,
            raw_file_key,
            content_preview: shared.content_preview,
            meta: shared.meta,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await?;
    ctx.search
        .upsert_document(SearchDocument {
            id: new_id.to_string(),
            uid: target.uid.to_string(),
            entity_type: EntityType::Resource.as_str().to_string(),
            title,
            content: shared.content.unwrap_or_default(),
        })
        .await?;
    ctx.store.increment_object_count(target.uid, 1).await
}

async fn materialize_code_artifact(
    ctx: &ServiceContext,
    shared: SharedCodeArtifact,
    new_id: &str,
    target: DuplicateTarget<'_>,
    title: Option<&str>,
) -> CoreResult<()> {
    check_storage_quota(ctx.store.as_ref(), target.uid, 1).await?;
    let storage_key = keys::code_artifact_key(new_id);
    ctx.storage
        .put_object(&storage_key, Bytes::from(shared.content.clone()), "text/plain")
        .await?;

    let title = title.map_or(shared.title, str::to_string);
    let now = Utc::now();
    ctx.store
        .create_code_artifact(&CodeArtifact {
            artifact_id: new_id.to_string(),
            uid: target.uid.to_string(),
            title: title.clone(),
            language: shared.language,
            artifact_type: shared.artifact_type,
            canvas_id: target.canvas_id.map(str::to_string),
            storage_key,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await?;
    ctx.search
        .upsert_document(SearchDocument {
            id: new_id.to_string(),
            uid: target.uid.to_string(),
            entity_type: EntityType::CodeArtifact.as_str().to_string(),
            title,
            content: shared.content,
        })
        .await?;
    ctx.store.increment_object_count(target.uid, 1).await
}

async fn materialize_skill_response(
    ctx: &ServiceContext,
    shared: SharedSkillResponse,
    new_id: &str,
    target: DuplicateTarget<'_>,
    title: Option<&str>,
    remap: &RemapTable,
) -> CoreResult<()> {
    let mut copy = copy_action_result(
        &shared.result,
        &shared.tool_calls,
        &shared.messages,
        new_id,
        target.uid,
        target.canvas_id,
        remap,
    );
    if let Some(title) = title {
        copy.result.title = title.to_string();
    }
    ctx.store.create_action_result(&copy.result).await?;
    if !copy.tool_calls.is_empty() {
        ctx.store.create_tool_calls(&copy.tool_calls).await?;
    }
    if !copy.messages.is_empty() {
        ctx.store.create_action_messages(&copy.messages).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Canvases
// ---------------------------------------------------------------------------

async fn duplicate_shared_canvas(
    ctx: &ServiceContext,
    uid: &str,
    record: &ShareRecord,
    shared: SharedCanvas,
    req: &DuplicateShareRequest,
) -> CoreResult<Entity> {
    let children: HashMap<String, ShareRecord> = ctx
        .store
        .list_child_shares(&record.share_id)
        .await?
        .into_iter()
        .map(|child| (child.share_id.clone(), child))
        .collect();

    let mut state = CanvasState::new(shared.nodes, shared.edges);
    let refs: Vec<(EntityType, String)> = state
        .entity_refs()
        .into_iter()
        .filter(|(_, id)| children.contains_key(id))
        .collect();
    let library = refs.iter().filter(|(t, _)| t.is_library_entity()).count() as i64;
    check_storage_quota(ctx.store.as_ref(), uid, library).await?;

    let new_canvas_id = gen_canvas_id();
    let title = req
        .title
        .clone()
        .unwrap_or_else(|| shared.title.clone());
    ctx.store
        .create_canvas(&Canvas::placeholder(&new_canvas_id, uid, title, req.project_id.clone()))
        .await?;
    let dup_record = DuplicateRecord::pending(
        uid,
        &record.share_id,
        &new_canvas_id,
        EntityType::Canvas.as_str(),
    );

    let rebuilt = CanvasRebuild {
        ctx,
        uid,
        record,
        children: &children,
        new_canvas_id: &new_canvas_id,
        project_id: req.project_id.as_deref(),
    };
    let failed = match rebuilt
        .run(&refs, &shared.files, shared.variables, &dup_record, &mut state)
        .await
    {
        Ok(failed) => failed,
        Err(e) => {
            tracing::error!(
                share_id = %record.share_id,
                canvas_id = %new_canvas_id,
                error = %e,
                "Share duplication failed, discarding placeholder"
            );
            discard_canvas(ctx, &new_canvas_id, Some(&dup_record.record_id), None).await;
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
    tracing::debug!(
        share_id = %record.share_id,
        canvas_id = %new_canvas_id,
        nodes = state.nodes.len(),
        failed_entities = failed,
        "Canvas rebuilt from share"
    );
    Ok(Entity::new(new_canvas_id, EntityType::Canvas))
}

struct CanvasRebuild<'a> {
    ctx: &'a ServiceContext,
    uid: &'a str,
    record: &'a ShareRecord,
    children: &'a HashMap<String, ShareRecord>,
    new_canvas_id: &'a str,
    project_id: Option<&'a str>,
}

impl CanvasRebuild<'_> {
    /// Fill the placeholder. Returns the number of child shares that could
    /// not be materialized.
    async fn run(
        &self,
        refs: &[(EntityType, String)],
        files: &[SharedDriveFile],
        variables: Vec<WorkflowVariable>,
        dup_record: &DuplicateRecord,
        state: &mut CanvasState,
    ) -> CoreResult<usize> {
        let ctx = self.ctx;
        ctx.store.create_duplicate_record(dup_record).await?;

        let mut remap: RemapTable = refs
            .iter()
            .map(|(entity_type, child_id)| (child_id.clone(), gen_entity_id(*entity_type)))
            .collect();
        remap.insert(self.record.share_id.clone(), self.new_canvas_id);
        let files = self.restore_files(files).await?;
        remap.merge(&files.files);

        let target = DuplicateTarget {
            uid: self.uid,
            canvas_id: Some(self.new_canvas_id),
            project_id: self.project_id,
        };
        let (library, results): (Vec<_>, Vec<_>) = refs
            .iter()
            .partition(|(entity_type, _)| *entity_type != EntityType::SkillResponse);
        let mut failed = self.materialize_children(&library, target, &remap).await;
        for id in &failed {
            remap.remove(id);
        }
        let failed_results = self.materialize_children(&results, target, &remap).await;
        for id in &failed_results {
            remap.remove(id);
        }
        failed.extend(failed_results);
        let entity_failures = failed.len();
        failed.extend(files.failed.iter().cloned());

        let no_toolsets = RemapTable::new();
        let tables = RewriteTables {
            entities: &remap,
            toolsets: &no_toolsets,
            storage_keys: &files.storage_keys,
        };
        rewrite_state(state, tables, &failed);
        for node in state.nodes.iter_mut() {
            node.data.metadata.share_id = None;
        }
        let mut workflow = Workflow {
            variables,
            ..Workflow::default()
        };
        rewrite_variables(&mut workflow.variables, tables, &failed);

        let state_key = write_state(ctx, self.new_canvas_id, None, state).await?;
        let update = CanvasStateUpdate {
            canvas_id: self.new_canvas_id.to_string(),
            state_storage_key: state_key.clone(),
            version: state.version.clone(),
            workflow: workflow.to_value(),
            status: CANVAS_STATUS_READY.to_string(),
        };
        if let Err(e) = ctx
            .store
            .finalize_canvas_duplication(&update, &dup_record.record_id)
            .await
        {
            if let Err(cleanup) = ctx.storage.remove_objects(&[state_key]).await {
                tracing::warn!(canvas_id = self.new_canvas_id, error = %cleanup, "Failed to remove canvas state");
            }
            return Err(e);
        }
        Ok(entity_failures)
    }

    /// Materialize the child shares in `refs` into the IDs `remap` assigns
    /// them. Returns the child share IDs that failed.
    async fn materialize_children(
        &self,
        refs: &[&(EntityType, String)],
        target: DuplicateTarget<'_>,
        remap: &RemapTable,
    ) -> HashSet<String> {
        let ctx = self.ctx;
        let outcomes = run_bounded(
            ctx.config.duplicate_concurrency,
            refs.iter().filter_map(|(_, child_id)| {
                let child = self.children.get(child_id)?;
                let new_id = remap.get(child_id)?.to_string();
                Some(async move {
                    let result = async {
                        let share_type = share_type_of(child)?;
                        let content = load_content(ctx, child).await?;
                        materialize(ctx, child, share_type, &content, &new_id, target, None, remap)
                            .await
                    }
                    .await;
                    (child_id, result)
                })
            }),
        )
        .await;

        let mut failed = HashSet::new();
        for (child_id, result) in outcomes {
            if let Err(e) = result {
                tracing::warn!(child_share_id = %child_id, error = %e, "Shared entity not duplicated");
                failed.insert(child_id.clone());
            }
        }
        failed
    }

    /// Turn the share's file copies into drive files of the new canvas.
    async fn restore_files(&self, files: &[SharedDriveFile]) -> CoreResult<DriveFileRemap> {
        let ctx = self.ctx;
        let copies = run_bounded(
            ctx.config.drive_file_concurrency,
            files.iter().map(|shared| async move {
                let file_id = gen_drive_file_id();
                let key = keys::drive_file_key(self.uid, self.new_canvas_id, &file_id, &shared.name);
                let result = async {
                    ctx.storage.duplicate_file(&shared.storage_key, &key).await?;
                    ctx.store
                        .create_drive_file(&DriveFile {
                            file_id: file_id.clone(),
                            uid: self.uid.to_string(),
                            canvas_id: self.new_canvas_id.to_string(),
                            name: shared.name.clone(),
                            mime_type: shared.mime_type.clone(),
                            storage_key: key.clone(),
                            size: shared.size,
                            source: shared.source.clone(),
                            created_at: Utc::now(),
                            deleted_at: None,
                        })
                        .await
                }
                .await;
                (shared, file_id, key, result)
            }),
        )
        .await;

        let mut restored = DriveFileRemap::default();
        for (shared, file_id, key, result) in copies {
            match result {
                Ok(()) => {
                    restored.files.insert(shared.file_id.clone(), file_id);
                    restored.storage_keys.insert(shared.storage_key.clone(), key);
                }
                Err(e) => {
                    tracing::warn!(file_id = %shared.file_id, error = %e, "Shared file not restored");
                    restored.mark_failed(&shared.file_id, &shared.storage_key);
                }
            }
        }
        Ok(restored)
    }
}
