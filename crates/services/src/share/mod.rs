//! Share record manager.
//!
//! A share is a public JSON snapshot of an entity stored at
//! `share/{shareId}.json`, described by a `ShareRecord`. Records are
//! idempotent per `(uid, entity_id, entity_type, parent_share_id)`: sharing
//! the same entity again rewrites the blob in place and keeps the share ID.
//! Canvas and workflow app shares own child shares for every entity node.

pub mod canvas;
pub mod content;
pub mod duplicate;

use std::collections::HashSet;
use std::future::Future;

use bytes::Bytes;
use chrono::Utc;
use refly_core::error::{CoreError, CoreResult};
use refly_core::keys;
use refly_core::share::{gen_share_id, ShareEntityType};
use refly_core::types::EntityType;
use refly_db::models::action_result::ActionResult;
use refly_db::models::share_record::{ShareRecord, UpdateShareRecord};
use refly_events::bus::{SHARE_CREATED, SHARE_DELETED};
use refly_events::{DomainEvent, Job};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::context::ServiceContext;
use crate::jobs::dispatch;
use content::{
    SharedCanvas, SharedCodeArtifact, SharedDocument, SharedResource, SharedSkillResponse,
    SharedWorkflowApp,
};

pub use canvas::{create_share_for_canvas, create_share_for_workflow_app, WorkflowAppShares};
pub use duplicate::{duplicate_share, DuplicateShareRequest};

/// Per-call share settings.
#[derive(Debug, Clone, Copy)]
pub struct ShareOptions<'a> {
    /// Defaults to the entity's own title.
    pub title: Option<&'a str>,
    pub parent_share_id: Option<&'a str>,
    pub allow_duplication: bool,
}

impl Default for ShareOptions<'_> {
    fn default() -> Self {
        Self {
            title: None,
            parent_share_id: None,
            allow_duplication: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    #[validate(length(min = 1))]
    pub entity_type: String,
    #[validate(length(min = 1))]
    pub entity_id: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub title: Option<String>,
    #[serde(default)]
    pub allow_duplication: Option<bool>,
    #[serde(default)]
    pub parent_share_id: Option<String>,
}

impl CreateShareRequest {
    fn options(&self) -> ShareOptions<'_> {
        ShareOptions {
            title: self.title.as_deref(),
            parent_share_id: self.parent_share_id.as_deref(),
            allow_duplication: self.allow_duplication.unwrap_or(true),
        }
    }
}

/// A share record together with its public content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub record: ShareRecord,
    pub content: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Record upsert
// ---------------------------------------------------------------------------

/// Find-or-create the share record for an entity and write its blob.
///
/// `build` receives the share ID (reused or fresh) and returns the content.
/// On reuse, objects the previous blob owned that the new one no longer
/// references are scheduled for removal.
pub(crate) async fn upsert_share<F, Fut>(
    ctx: &ServiceContext,
    uid: &str,
    entity_id: &str,
    share_type: ShareEntityType,
    title: String,
    opts: ShareOptions<'_>,
    build: F,
) -> CoreResult<ShareRecord>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = CoreResult<serde_json::Value>>,
{
    let existing = ctx
        .store
        .find_active_share(uid, entity_id, share_type.as_str(), opts.parent_share_id)
        .await?;
    let share_id = existing
        .as_ref()
        .map(|r| r.share_id.clone())
        .unwrap_or_else(|| gen_share_id(share_type));
    let previous_keys = match &existing {
        Some(record) => owned_object_keys(ctx, record).await,
        None => Vec::new(),
    };

    let content = build(share_id.clone()).await?;
    let storage_key = keys::share_key(&share_id);
    ctx.storage
        .put_object(
            &storage_key,
            Bytes::from(serde_json::to_vec(&content)?),
            "application/json",
        )
        .await?;

    let record = match existing {
        Some(_) => {
            let updated = ctx
                .store
                .update_share(
                    &share_id,
                    &UpdateShareRecord {
                        title,
                        storage_key,
                        allow_duplication: opts.allow_duplication,
                    },
                )
                .await?;
            let current: HashSet<String> = content_object_keys(share_type, &content)
                .into_iter()
                .collect();
            let stale: Vec<String> = previous_keys
                .into_iter()
                .filter(|k| !current.contains(k))
                .collect();
            if !stale.is_empty() {
                if let Err(e) = dispatch(ctx, Job::DeleteObjects { keys: stale }).await {
                    tracing::warn!(share_id = %share_id, error = %e, "Stale share objects not scheduled for removal");
                }
            }
            tracing::debug!(share_id = %share_id, entity_id, "Share record reused");
            updated
        }
        None => {
            let now = Utc::now();
            let record = ShareRecord {
                share_id: share_id.clone(),
                uid: uid.to_string(),
                entity_id: entity_id.to_string(),
                entity_type: share_type.as_str().to_string(),
                title,
                storage_key,
                parent_share_id: opts.parent_share_id.map(str::to_string),
                allow_duplication: opts.allow_duplication,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            match ctx.store.create_share(&record).await {
                Ok(()) => record,
                Err(CoreError::Conflict(_)) => {
                    return adopt_concurrent_share(ctx, uid, entity_id, share_type, opts, &record)
                        .await;
                }
                Err(e) => return Err(e),
            }
        }
    };

    if record.parent_share_id.is_none() {
        ctx.publish(
            DomainEvent::new(SHARE_CREATED)
                .with_entity(share_type.as_str(), &record.share_id)
                .with_actor(uid)
                .with_payload(serde_json::json!({ "entityId": entity_id })),
        );
    }
    Ok(record)
}

/// A concurrent request created the same share first. Keep theirs and drop
/// the blob written for ours.
async fn adopt_concurrent_share(
    ctx: &ServiceContext,
    uid: &str,
    entity_id: &str,
    share_type: ShareEntityType,
    opts: ShareOptions<'_>,
    ours: &ShareRecord,
) -> CoreResult<ShareRecord> {
    tracing::warn!(share_id = %ours.share_id, entity_id, "Share created concurrently, adopting existing record");
    if let Err(e) = ctx.storage.remove_objects(&[ours.storage_key.clone()]).await {
        tracing::warn!(key = %ours.storage_key, error = %e, "Failed to remove losing share blob");
    }
    ctx.store
        .find_active_share(uid, entity_id, share_type.as_str(), opts.parent_share_id)
        .await?
        .ok_or_else(|| CoreError::Conflict(format!("share for {entity_id} changed concurrently")))
}

/// Object keys referenced by a share blob besides the blob itself.
pub(crate) fn content_object_keys(share_type: ShareEntityType, content: &serde_json::Value) -> Vec<String> {
    let parsed = match share_type {
        ShareEntityType::Canvas => serde_json::from_value::<SharedCanvas>(content.clone())
            .map(|c| c.file_keys().map(str::to_string).collect()),
        ShareEntityType::WorkflowApp | ShareEntityType::WorkflowAppTemplate => {
            serde_json::from_value::<SharedWorkflowApp>(content.clone())
                .map(|a| a.canvas.file_keys().map(str::to_string).collect())
        }
        ShareEntityType::Resource => serde_json::from_value::<SharedResource>(content.clone())
            .map(|r| r.raw_file_key.into_iter().collect()),
        _ => Ok(Vec::new()),
    };
    parsed.unwrap_or_default()
}

async fn owned_object_keys(ctx: &ServiceContext, record: &ShareRecord) -> Vec<String> {
    let Some(share_type) = ShareEntityType::from_name(&record.entity_type) else {
        return Vec::new();
    };
    match load_content(ctx, record).await {
        Ok(content) => content_object_keys(share_type, &content),
        Err(e) => {
            tracing::warn!(share_id = %record.share_id, error = %e, "Share blob unreadable");
            Vec::new()
        }
    }
}

pub(crate) async fn load_content(
    ctx: &ServiceContext,
    record: &ShareRecord,
) -> CoreResult<serde_json::Value> {
    let body = ctx.storage.get_object(&record.storage_key).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn read_text(ctx: &ServiceContext, key: &str) -> CoreResult<String> {
    let body = ctx.storage.get_object(key).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

// ---------------------------------------------------------------------------
// Entity shares
// ---------------------------------------------------------------------------

pub async fn create_share_for_document(
    ctx: &ServiceContext,
    uid: &str,
    doc_id: &str,
    opts: ShareOptions<'_>,
) -> CoreResult<ShareRecord> {
    let doc = ctx
        .store
        .find_document(doc_id)
        .await?
        .filter(|d| d.uid == uid && d.deleted_at.is_none())
        .ok_or_else(|| CoreError::not_found("Document", doc_id))?;
    let title = opts.title.map_or_else(|| doc.title.clone(), str::to_string);
    let doc = &doc;

    upsert_share(ctx, uid, doc_id, ShareEntityType::Document, title, opts, move |_| async move {
        let content = read_text(ctx, &doc.storage_key).await?;
        Ok(serde_json::to_value(SharedDocument {
            title: doc.title.clone(),
            content,
            content_preview: doc.content_preview.clone(),
        })?)
    })
    .await
}

/// Share a resource. The raw upload, if any, is copied under the share so
/// the public blob never points at the owner's private key.
pub async fn create_share_for_resource(
    ctx: &ServiceContext,
    uid: &str,
    resource_id: &str,
    opts: ShareOptions<'_>,
) -> CoreResult<ShareRecord> {
    let resource = ctx
        .store
        .find_resource(resource_id)
        .await?
        .filter(|r| r.uid == uid && r.deleted_at.is_none())
        .ok_or_else(|| CoreError::not_found("Resource", resource_id))?;
    let title = opts
        .title
        .map_or_else(|| resource.title.clone(), str::to_string);
    let resource = &resource;

    upsert_share(ctx, uid, resource_id, ShareEntityType::Resource, title, opts, move |share_id| async move {
        let content = match resource.storage_key.as_deref() {
            Some(key) => Some(read_text(ctx, key).await?),
            None => None,
        };
        let raw_file_key = match resource.raw_file_key.as_deref() {
            Some(src) => {
                let key = keys::share_raw_key(&share_id, src);
                ctx.storage.duplicate_file(src, &key).await?;
                Some(key)
            }
            None => None,
        };
        Ok(serde_json::to_value(SharedResource {
            title: resource.title.clone(),
            resource_type: resource.resource_type.clone(),
            content,
            content_preview: resource.content_preview.clone(),
            meta: resource.meta.clone(),
            raw_file_key,
        })?)
    })
    .await
}

pub async fn create_share_for_code_artifact(
    ctx: &ServiceContext,
    uid: &str,
    artifact_id: &str,
    opts: ShareOptions<'_>,
) -> CoreResult<ShareRecord> {
    let artifact = ctx
        .store
        .find_code_artifact(artifact_id)
        .await?
        .filter(|a| a.uid == uid && a.deleted_at.is_none())
        .ok_or_else(|| CoreError::not_found("CodeArtifact", artifact_id))?;
    let title = opts
        .title
        .map_or_else(|| artifact.title.clone(), str::to_string);
    let artifact = &artifact;

    upsert_share(ctx, uid, artifact_id, ShareEntityType::CodeArtifact, title, opts, move |_| async move {
        let content = read_text(ctx, &artifact.storage_key).await?;
        Ok(serde_json::to_value(SharedCodeArtifact {
            title: artifact.title.clone(),
            language: artifact.language.clone(),
            artifact_type: artifact.artifact_type.clone(),
            content,
        })?)
    })
    .await
}

/// Share the latest version of a skill response with its tool calls and
/// messages.
pub async fn create_share_for_skill_response(
    ctx: &ServiceContext,
    uid: &str,
    result_id: &str,
    opts: ShareOptions<'_>,
) -> CoreResult<ShareRecord> {
    let result = ctx
        .store
        .find_action_result(result_id)
        .await?
        .filter(|r| r.uid == uid && r.deleted_at.is_none())
        .ok_or_else(|| CoreError::not_found("ActionResult", result_id))?;
    let title = opts.title.map_or_else(|| result.title.clone(), str::to_string);
    let result = &result;

    upsert_share(ctx, uid, result_id, ShareEntityType::SkillResponse, title, opts, move |_| async move {
        let tool_calls = ctx.store.list_tool_calls(result_id, result.version).await?;
        let messages = ctx
            .store
            .list_action_messages(result_id, result.version)
            .await?;
        Ok(serde_json::to_value(SharedSkillResponse {
            result: ActionResult {
                uid: String::new(),
                ..result.clone()
            },
            tool_calls,
            messages,
        })?)
    })
    .await
}

/// Share one canvas node entity. Only the kinds that become child shares of a
/// canvas are accepted.
pub(crate) async fn share_entity(
    ctx: &ServiceContext,
    uid: &str,
    entity_type: EntityType,
    entity_id: &str,
    opts: ShareOptions<'_>,
) -> CoreResult<ShareRecord> {
    match entity_type {
        EntityType::Document => create_share_for_document(ctx, uid, entity_id, opts).await,
        EntityType::Resource => create_share_for_resource(ctx, uid, entity_id, opts).await,
        EntityType::CodeArtifact => create_share_for_code_artifact(ctx, uid, entity_id, opts).await,
        EntityType::SkillResponse => {
            create_share_for_skill_response(ctx, uid, entity_id, opts).await
        }
        other => Err(CoreError::Params(format!("{other} cannot be shared as a node"))),
    }
}

/// Share any supported entity by its type name.
pub async fn create_share(
    ctx: &ServiceContext,
    uid: &str,
    req: &CreateShareRequest,
) -> CoreResult<ShareRecord> {
    let share_type = ShareEntityType::from_name(&req.entity_type)
        .ok_or_else(|| CoreError::Params(format!("unknown entity type: {}", req.entity_type)))?;
    let opts = req.options();
    match share_type {
        ShareEntityType::Canvas => create_share_for_canvas(ctx, uid, &req.entity_id, opts).await,
        ShareEntityType::WorkflowApp => {
            create_share_for_workflow_app(ctx, uid, &req.entity_id, false)
                .await
                .map(|shares| shares.share)
        }
        ShareEntityType::DriveFile | ShareEntityType::WorkflowAppTemplate => Err(
            CoreError::Params(format!("{share_type} shares are created through their parent")),
        ),
        other => share_entity(ctx, uid, other.entity_type(), &req.entity_id, opts).await,
    }
}

// ---------------------------------------------------------------------------
// Read and delete
// ---------------------------------------------------------------------------

/// Public read of a live share.
pub async fn get_share(ctx: &ServiceContext, share_id: &str) -> CoreResult<ShareView> {
    let record = ctx
        .store
        .find_share(share_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Share", share_id))?;
    let content = load_content(ctx, &record).await?;
    Ok(ShareView { record, content })
}

/// Soft-delete a share and every share below it, then remove their objects.
/// Returns the number of records deleted.
pub async fn delete_share(ctx: &ServiceContext, uid: &str, share_id: &str) -> CoreResult<u64> {
    let root = ctx
        .store
        .find_share(share_id)
        .await?
        .filter(|r| r.uid == uid)
        .ok_or_else(|| CoreError::not_found("Share", share_id))?;

    let mut records = vec![root];
    let mut next = 0;
    while next < records.len() {
        let children = ctx.store.list_child_shares(&records[next].share_id).await?;
        records.extend(children);
        next += 1;
    }

    let mut object_keys = Vec::new();
    for record in &records {
        object_keys.extend(owned_object_keys(ctx, record).await);
        object_keys.push(record.storage_key.clone());
    }
    let ids: Vec<String> = records.iter().map(|r| r.share_id.clone()).collect();
    let deleted = ctx.store.soft_delete_shares(&ids).await?;

    if let Err(e) = dispatch(ctx, Job::DeleteObjects { keys: object_keys }).await {
        tracing::warn!(share_id, error = %e, "Share objects not scheduled for removal");
    }
    ctx.publish(
        DomainEvent::new(SHARE_DELETED)
            .with_entity(records[0].entity_type.clone(), share_id)
            .with_actor(uid)
            .with_payload(serde_json::json!({ "deleted": deleted })),
    );
    tracing::info!(share_id, deleted, "Share deleted");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canvas_blob_owns_its_file_copies() {
        let content = json!({
            "title": "T",
            "nodes": [],
            "edges": [],
            "files": [{
                "fileId": "dfs-1",
                "name": "a.pdf",
                "mimeType": "application/pdf",
                "size": 3,
                "source": "upload",
                "storageKey": "share/can-1/files/dfs-1-a.pdf"
            }]
        });
        assert_eq!(
            content_object_keys(ShareEntityType::Canvas, &content),
            vec!["share/can-1/files/dfs-1-a.pdf".to_string()]
        );
        let app = json!({ "title": "App", "canvas": content });
        assert_eq!(content_object_keys(ShareEntityType::WorkflowAppTemplate, &app).len(), 1);
    }

    #[test]
    fn unparseable_blob_owns_nothing() {
        assert!(content_object_keys(ShareEntityType::Canvas, &json!({"nodes": 1})).is_empty());
        assert!(content_object_keys(ShareEntityType::Document, &json!({})).is_empty());
    }
}
