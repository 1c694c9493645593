//! Per-type duplication of documents, resources, code artifacts and skill
//! responses. Each one is tracked by a `DuplicateRecord`.

use std::future::Future;

use chrono::Utc;
use refly_core::error::{CoreError, CoreResult};
use refly_core::ids::gen_message_id;
use refly_core::keys;
use refly_core::remap::RemapTable;
use refly_core::tool_calls::{remap_tool_call_ids, ToolCallRef};
use refly_core::types::EntityType;
use refly_db::models::action_result::{ActionMessage, ActionResult, ToolCall};
use refly_db::models::code_artifact::CodeArtifact;
use refly_db::models::document::Document;
use refly_db::models::duplicate_record::{
    DuplicateRecord, DUPLICATE_STATUS_FAILED, DUPLICATE_STATUS_FINISH,
};
use refly_db::models::resource::Resource;

use super::DuplicateTarget;
use crate::context::ServiceContext;
use crate::quota::check_storage_quota;

/// Run `work` under a pending duplicate record and settle the record from
/// its outcome.
pub(crate) async fn tracked<T, F>(
    ctx: &ServiceContext,
    entity_type: EntityType,
    source_id: &str,
    new_id: &str,
    uid: &str,
    work: F,
) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    let record = DuplicateRecord::pending(uid, source_id, new_id, entity_type.as_str());
    ctx.store.create_duplicate_record(&record).await?;

    let result = work.await;
    let status = if result.is_ok() {
        DUPLICATE_STATUS_FINISH
    } else {
        DUPLICATE_STATUS_FAILED
    };
    if let Err(e) = ctx
        .store
        .update_duplicate_record_status(&record.record_id, status)
        .await
    {
        tracing::warn!(record_id = %record.record_id, error = %e, "Failed to settle duplicate record");
    }
    result
}

// ---------------------------------------------------------------------------
// Library entities
// ---------------------------------------------------------------------------

pub async fn duplicate_document(
    ctx: &ServiceContext,
    source_id: &str,
    new_id: &str,
    target: DuplicateTarget<'_>,
) -> CoreResult<Document> {
    tracked(ctx, EntityType::Document, source_id, new_id, target.uid, async {
        let source = ctx
            .store
            .find_document(source_id)
            .await?
            .filter(|d| d.deleted_at.is_none())
            .ok_or_else(|| CoreError::not_found("Document", source_id))?;
        check_storage_quota(ctx.store.as_ref(), target.uid, 1).await?;

        let storage_key = keys::document_key(new_id);
        ctx.storage
            .duplicate_file(&source.storage_key, &storage_key)
            .await?;

        let now = Utc::now();
        let doc = Document {
            doc_id: new_id.to_string(),
            uid: target.uid.to_string(),
            canvas_id: target.canvas_id.map(str::to_string),
            project_id: target.project_id.map(str::to_string),
            storage_key,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..source
        };
        ctx.store.create_document(&doc).await?;
        ctx.search
            .duplicate_document(source_id, new_id, target.uid)
            .await?;
        ctx.store.increment_object_count(target.uid, 1).await?;

        tracing::debug!(source_id, new_id, "Document duplicated");
        Ok::<_, CoreError>(doc)
    })
    .await
}

pub async fn duplicate_resource(
    ctx: &ServiceContext,
    source_id: &str,
    new_id: &str,
    target: DuplicateTarget<'_>,
) -> CoreResult<Resource> {
    tracked(ctx, EntityType::Resource, source_id, new_id, target.uid, async {
        let source = ctx
            .store
            .find_resource(source_id)
            .await?
            .filter(|r| r.deleted_at.is_none())
            .ok_or_else(|| CoreError::not_found("Resource", source_id))?;
        check_storage_quota(ctx.store.as_ref(), target.uid, 1).await?;

        let storage_key = match source.storage_key.as_deref() {
            Some(src) => {
                let key = keys::resource_key(new_id);
                ctx.storage.duplicate_file(src, &key).await?;
                Some(key)
            }
            None => None,
        };
        let raw_file_key = match source.raw_file_key.as_deref() {
            Some(src) => {
                let key = keys::resource_raw_key(new_id, src);
                ctx.storage.duplicate_file(src, &key).await?;
                Some(key)
            }
            None => None,
        };

        let now = Utc::now();
        let resource = Resource {
            resource_id: new_id.to_string(),
            uid: target.uid.to_string(),
            canvas_id: target.canvas_id.map(str::to_string),
            project_id: target.project_id.map(str::to_string),
            storage_key,
            raw_file_key,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..source
        };
        ctx.store.create_resource(&resource).await?;
        ctx.search
            .duplicate_document(source_id, new_id, target.uid)
            .await?;
        ctx.store.increment_object_count(target.uid, 1).await?;

        tracing::debug!(source_id, new_id, "Resource duplicated");
        Ok::<_, CoreError>(resource)
    })
    .await
}

pub async fn duplicate_code_artifact(
    ctx: &ServiceContext,
    source_id: &str,
    new_id: &str,
    target: DuplicateTarget<'_>,
) -> CoreResult<CodeArtifact> {
    tracked(ctx, EntityType::CodeArtifact, source_id, new_id, target.uid, async {
        let source = ctx
            .store
            .find_code_artifact(source_id)
            .await?
            .filter(|a| a.deleted_at.is_none())
            .ok_or_else(|| CoreError::not_found("CodeArtifact", source_id))?;
        check_storage_quota(ctx.store.as_ref(), target.uid, 1).await?;

        let storage_key = keys::code_artifact_key(new_id);
        ctx.storage
            .duplicate_file(&source.storage_key, &storage_key)
            .await?;

        let now = Utc::now();
        let artifact = CodeArtifact {
            artifact_id: new_id.to_string(),
            uid: target.uid.to_string(),
            canvas_id: target.canvas_id.map(str::to_string),
            storage_key,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..source
        };
        ctx.store.create_code_artifact(&artifact).await?;
        ctx.search
            .duplicate_document(source_id, new_id, target.uid)
            .await?;
        ctx.store.increment_object_count(target.uid, 1).await?;

        tracing::debug!(source_id, new_id, "Code artifact duplicated");
        Ok::<_, CoreError>(artifact)
    })
    .await
}

// ---------------------------------------------------------------------------
// Skill responses
// ---------------------------------------------------------------------------

/// Duplicate the latest version of an action result as version 0 of
/// `new_id`, with regenerated tool-call and message IDs.
///
/// Context, input and history blobs are rewritten through `remap` so they
/// point at the other duplicated entities.
pub async fn duplicate_action_result(
    ctx: &ServiceContext,
    source_id: &str,
    new_id: &str,
    target: DuplicateTarget<'_>,
    remap: &RemapTable,
) -> CoreResult<ActionResult> {
    tracked(ctx, EntityType::SkillResponse, source_id, new_id, target.uid, async {
        let source = ctx
            .store
            .find_action_result(source_id)
            .await?
            .filter(|r| r.deleted_at.is_none())
            .ok_or_else(|| CoreError::not_found("ActionResult", source_id))?;
        let calls = ctx.store.list_tool_calls(source_id, source.version).await?;
        let messages = ctx
            .store
            .list_action_messages(source_id, source.version)
            .await?;

        let copy = copy_action_result(
            &source,
            &calls,
            &messages,
            new_id,
            target.uid,
            target.canvas_id,
            remap,
        );

        ctx.store.create_action_result(&copy.result).await?;
        // Messages reference call IDs, so calls go first.
        if !copy.tool_calls.is_empty() {
            ctx.store.create_tool_calls(&copy.tool_calls).await?;
        }
        if !copy.messages.is_empty() {
            ctx.store.create_action_messages(&copy.messages).await?;
        }

        tracing::debug!(
            source_id,
            new_id,
            tool_calls = copy.tool_calls.len(),
            messages = copy.messages.len(),
            "Action result duplicated"
        );
        Ok::<_, CoreError>(copy.result)
    })
    .await
}

/// The rows making up a duplicated action result.
pub struct ActionResultCopy {
    pub result: ActionResult,
    pub tool_calls: Vec<ToolCall>,
    pub messages: Vec<ActionMessage>,
}

/// Build the copy of an action result without touching the store.
///
/// Tool-call IDs are derived deterministically from the new result ID and
/// every message `tool_call_id` follows the same mapping. Also used when a
/// shared skill response is materialized.
pub fn copy_action_result(
    source: &ActionResult,
    calls: &[ToolCall],
    messages: &[ActionMessage],
    new_id: &str,
    uid: &str,
    canvas_id: Option<&str>,
    remap: &RemapTable,
) -> ActionResultCopy {
    const VERSION: i32 = 0;
    let now = Utc::now();

    let call_ids = remap_tool_call_ids(
        new_id,
        VERSION,
        calls.iter().map(|c| ToolCallRef {
            call_id: &c.call_id,
            toolset_id: &c.toolset_id,
            tool_name: &c.tool_name,
        }),
    );

    let result = ActionResult {
        result_id: new_id.to_string(),
        version: VERSION,
        uid: uid.to_string(),
        title: source.title.clone(),
        target_id: canvas_id.map(str::to_string),
        status: source.status.clone(),
        input: remap.replace_in_json(&source.input),
        context: remap.replace_in_json(&source.context),
        tool_sets: source.tool_sets.clone(),
        actual_tools: source.actual_tools.clone(),
        history: remap.replace_in_json(&source.history),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let tool_calls = calls
        .iter()
        .map(|c| ToolCall {
            call_id: call_ids.resolve(&c.call_id).to_string(),
            result_id: new_id.to_string(),
            version: VERSION,
            input: remap.replace_in_json(&c.input),
            output: remap.replace_in_json(&c.output),
            created_at: now,
            ..c.clone()
        })
        .collect();

    let messages = messages
        .iter()
        .map(|m| ActionMessage {
            message_id: gen_message_id(),
            result_id: new_id.to_string(),
            version: VERSION,
            kind: m.kind.clone(),
            content: call_ids.replace_in_text(&remap.replace_in_text(&m.content)),
            tool_call_id: m
                .tool_call_id
                .as_deref()
                .map(|id| call_ids.resolve(id).to_string()),
            created_at: now,
        })
        .collect();

    ActionResultCopy {
        result,
        tool_calls,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(id: &str) -> ActionResult {
        let now = Utc::now();
        ActionResult {
            result_id: id.into(),
            version: 3,
            uid: "u-1".into(),
            title: "Ask".into(),
            target_id: Some("c-old".into()),
            status: "finish".into(),
            input: json!({"query": "summarize d-old"}),
            context: json!({"resources": [{"entityId": "d-old"}]}),
            tool_sets: json!([]),
            actual_tools: json!([]),
            history: json!([]),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn call(id: &str, tool: &str) -> ToolCall {
        ToolCall {
            call_id: id.into(),
            result_id: "ar-old".into(),
            version: 3,
            toolset_id: "ts-1".into(),
            tool_name: tool.into(),
            step_name: None,
            input: json!({}),
            output: json!({}),
            status: "completed".into(),
            created_at: Utc::now(),
        }
    }

    fn message(tool_call_id: Option<&str>) -> ActionMessage {
        ActionMessage {
            message_id: "m-old".into(),
            result_id: "ar-old".into(),
            version: 3,
            kind: "tool".into(),
            content: "see d-old".into(),
            tool_call_id: tool_call_id.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn copy_resets_version_and_rewrites_references() {
        let remap: RemapTable = [("d-old".to_string(), "d-new".to_string())]
            .into_iter()
            .collect();
        let calls = vec![call("tc-a", "search"), call("tc-b", "search")];
        let messages = vec![message(Some("tc-b")), message(None)];

        let copy = copy_action_result(
            &result("ar-old"),
            &calls,
            &messages,
            "ar-new",
            "u-2",
            Some("c-new"),
            &remap,
        );

        assert_eq!(copy.result.version, 0);
        assert_eq!(copy.result.uid, "u-2");
        assert_eq!(copy.result.target_id.as_deref(), Some("c-new"));
        assert_eq!(copy.result.context["resources"][0]["entityId"], "d-new");
        assert_eq!(copy.result.input["query"], "summarize d-new");

        let new_ids: Vec<&str> = copy.tool_calls.iter().map(|c| c.call_id.as_str()).collect();
        assert_eq!(
            new_ids,
            vec![
                refly_core::tool_calls::tool_call_id("ar-new", 0, "ts-1", "search", 0),
                refly_core::tool_calls::tool_call_id("ar-new", 0, "ts-1", "search", 1),
            ]
        );
        assert_eq!(copy.messages[0].tool_call_id.as_deref(), Some(new_ids[1]));
        assert!(copy.messages[1].tool_call_id.is_none());
        assert_eq!(copy.messages[0].content, "see d-new");
        assert_ne!(copy.messages[0].message_id, "m-old");
    }
}
