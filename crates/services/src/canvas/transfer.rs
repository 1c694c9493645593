//! Canvas export and import.
//!
//! An export carries the graph, the workflow variables and the definitions
//! of every toolset selected on its nodes. Importing deduplicates those
//! toolsets by `key` against the importer's own toolsets.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use refly_core::canvas::{CanvasEdge, CanvasNode, CanvasState};
use refly_core::error::{CoreError, CoreResult};
use refly_core::ids::{gen_canvas_id, gen_toolset_id};
use refly_core::remap::RemapTable;
use refly_core::rewrite::{rewrite_state, rewrite_variables, RewriteTables};
use refly_core::types::{Entity, EntityType};
use refly_core::workflow::{Workflow, WorkflowVariable};
use refly_db::models::canvas::{Canvas, CanvasStateUpdate, CANVAS_STATUS_READY};
use refly_db::models::toolset::Toolset;
use refly_events::bus::CANVAS_IMPORTED;
use refly_events::{DomainEvent, Job};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{discard_canvas, find_owned_canvas, load_state, parse_workflow, write_state};
use crate::context::ServiceContext;
use crate::jobs::dispatch;

const DEFAULT_IMPORT_TITLE: &str = "Imported canvas";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedToolset {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasExport {
    #[serde(default)]
    pub title: String,
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
    #[serde(default)]
    pub variables: Vec<WorkflowVariable>,
    #[serde(default)]
    pub toolsets: Vec<ExportedToolset>,
}

impl CanvasExport {
    /// Parse an uploaded export, rejecting payloads without a node or edge
    /// list.
    pub fn from_value(value: &serde_json::Value) -> CoreResult<Self> {
        for field in ["nodes", "edges"] {
            if !value.get(field).is_some_and(serde_json::Value::is_array) {
                return Err(CoreError::Params(format!("canvas data must contain {field}")));
            }
        }
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Params(format!("invalid canvas data: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportCanvasRequest {
    pub data: serde_json::Value,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub title: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

pub async fn export_canvas(
    ctx: &ServiceContext,
    uid: &str,
    canvas_id: &str,
) -> CoreResult<CanvasExport> {
    let canvas = find_owned_canvas(ctx, uid, canvas_id).await?;
    let state = load_state(ctx, &canvas).await?;
    let variables = parse_workflow(&canvas)
        .map(|workflow| workflow.variables)
        .unwrap_or_default();

    let mut toolset_ids: Vec<String> = Vec::new();
    for node in &state.nodes {
        for toolset in node.data.metadata.selected_toolsets.iter().flatten() {
            if !toolset_ids.contains(&toolset.id) {
                toolset_ids.push(toolset.id.clone());
            }
        }
    }
    let toolsets = ctx
        .store
        .list_toolsets_by_ids(&toolset_ids)
        .await?
        .into_iter()
        .map(|t| ExportedToolset {
            id: t.toolset_id,
            key: t.key,
            name: t.name,
            auth_type: t.auth_type,
        })
        .collect();

    tracing::info!(canvas_id, nodes = state.nodes.len(), "Canvas exported");
    Ok(CanvasExport {
        title: canvas.title,
        nodes: state.nodes,
        edges: state.edges,
        variables,
        toolsets,
    })
}

/// Map every exported toolset onto one of the importer's toolsets, creating
/// those whose key the importer does not have yet.
async fn resolve_toolsets(
    ctx: &ServiceContext,
    uid: &str,
    exported: &[ExportedToolset],
) -> CoreResult<RemapTable> {
    let mut table = RemapTable::new();
    if exported.is_empty() {
        return Ok(table);
    }

    let mut by_key: HashMap<String, String> = ctx
        .store
        .list_user_toolsets(uid)
        .await?
        .into_iter()
        .map(|t| (t.key, t.toolset_id))
        .collect();

    for toolset in exported {
        if let Some(existing) = by_key.get(&toolset.key) {
            table.insert(toolset.id.clone(), existing.clone());
            continue;
        }
        let created = Toolset {
            toolset_id: gen_toolset_id(),
            uid: uid.to_string(),
            key: toolset.key.clone(),
            name: toolset.name.clone(),
            auth_type: toolset.auth_type.clone(),
            config: serde_json::json!({}),
            created_at: Utc::now(),
            deleted_at: None,
        };
        ctx.store.create_toolset(&created).await?;
        tracing::debug!(key = %created.key, toolset_id = %created.toolset_id, "Toolset created on import");
        by_key.insert(created.key.clone(), created.toolset_id.clone());
        table.insert(toolset.id.clone(), created.toolset_id);
    }
    Ok(table)
}

pub async fn import_canvas(
    ctx: &ServiceContext,
    uid: &str,
    req: &ImportCanvasRequest,
) -> CoreResult<Entity> {
    let export = CanvasExport::from_value(&req.data)?;
    let toolsets = resolve_toolsets(ctx, uid, &export.toolsets).await?;

    let empty = RemapTable::new();
    let tables = RewriteTables {
        entities: &empty,
        toolsets: &toolsets,
        storage_keys: &empty,
    };
    let mut state = CanvasState::new(export.nodes, export.edges);
    let none = HashSet::new();
    rewrite_state(&mut state, tables, &none);
    let mut workflow = Workflow {
        variables: export.variables,
        ..Workflow::default()
    };
    rewrite_variables(&mut workflow.variables, tables, &none);

    let canvas_id = gen_canvas_id();
    let title = req
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| Some(export.title).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| DEFAULT_IMPORT_TITLE.to_string());
    ctx.store
        .create_canvas(&Canvas::placeholder(&canvas_id, uid, title, req.project_id.clone()))
        .await?;

    let mut state_key = None;
    let saved = async {
        let key = write_state(ctx, &canvas_id, None, &mut state).await?;
        state_key = Some(key.clone());
        ctx.store
            .update_canvas_state(&CanvasStateUpdate {
                canvas_id: canvas_id.clone(),
                state_storage_key: key,
                version: state.version.clone(),
                workflow: workflow.to_value(),
                status: CANVAS_STATUS_READY.to_string(),
            })
            .await
    }
    .await;
    if let Err(e) = saved {
        tracing::error!(canvas_id = %canvas_id, error = %e, "Canvas import failed, discarding placeholder");
        discard_canvas(ctx, &canvas_id, None, state_key.as_deref()).await;
        return Err(e);
    }

    if let Err(e) = dispatch(
        ctx,
        Job::SyncCanvasRelations {
            canvas_id: canvas_id.clone(),
        },
    )
    .await
    {
        tracing::warn!(canvas_id = %canvas_id, error = %e, "Relation sync not scheduled");
    }
    ctx.publish(
        DomainEvent::new(CANVAS_IMPORTED)
            .with_entity(EntityType::Canvas.as_str(), &canvas_id)
            .with_actor(uid)
            .with_payload(serde_json::json!({ "toolsetsMapped": toolsets.len() })),
    );
    tracing::info!(canvas_id = %canvas_id, nodes = state.nodes.len(), "Canvas imported");
    Ok(Entity::new(canvas_id, EntityType::Canvas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn export_without_edges_is_a_params_error() {
        assert_matches!(
            CanvasExport::from_value(&json!({"nodes": []})),
            Err(CoreError::Params(msg)) if msg.contains("edges")
        );
        assert_matches!(
            CanvasExport::from_value(&json!({"edges": [], "nodes": null})),
            Err(CoreError::Params(msg)) if msg.contains("nodes")
        );
    }

    #[test]
    fn minimal_export_parses_with_defaults() {
        let export = CanvasExport::from_value(&json!({"nodes": [], "edges": []})).unwrap();
        assert!(export.title.is_empty());
        assert!(export.toolsets.is_empty());
        assert!(export.variables.is_empty());
    }
}
