//! Canvas graph rewriter.
//!
//! Runs after every entity of a duplication (or share) has been processed and
//! the remap tables are complete. Purely substitutive: IDs that are not in a
//! table are left as they are.

use std::collections::HashSet;

use crate::canvas::{CanvasEdge, CanvasNode, CanvasState};
use crate::remap::RemapTable;
use crate::workflow::{VariableResource, WorkflowVariable};

/// The tables a rewrite pass substitutes through.
#[derive(Debug, Clone, Copy)]
pub struct RewriteTables<'a> {
    /// Entity and drive-file IDs (documents, resources, results, files, canvas).
    pub entities: &'a RemapTable,
    /// Toolset IDs, computed independently because toolsets are imported and
    /// deduplicated per user.
    pub toolsets: &'a RemapTable,
    /// Object storage keys of copied media/files.
    pub storage_keys: &'a RemapTable,
}

impl<'a> RewriteTables<'a> {
    pub fn entities_only(entities: &'a RemapTable, empty: &'a RemapTable) -> Self {
        Self {
            entities,
            toolsets: empty,
            storage_keys: empty,
        }
    }
}

/// Rewrite one node in place.
pub fn rewrite_node(node: &mut CanvasNode, tables: RewriteTables<'_>) {
    if !node.data.entity_id.is_empty() {
        let resolved = tables.entities.resolve(&node.data.entity_id).to_string();
        node.data.entity_id = resolved;
    }

    let meta = &mut node.data.metadata;
    if let Some(items) = meta.context_items.as_ref() {
        meta.context_items = Some(tables.entities.replace_in_json(items));
    }
    if let Some(data) = meta.structured_data.as_ref() {
        meta.structured_data = Some(tables.entities.replace_in_json(data));
    }
    if let Some(toolsets) = meta.selected_toolsets.as_mut() {
        for toolset in toolsets.iter_mut() {
            let resolved = tables.toolsets.resolve(&toolset.id).to_string();
            toolset.id = resolved;
        }
    }
    if let Some(key) = meta.storage_key.as_ref() {
        let resolved = tables.storage_keys.resolve(key).to_string();
        meta.storage_key = Some(resolved);
    }
}

fn rewrite_edge(edge: &mut CanvasEdge, tables: RewriteTables<'_>) {
    if edge.extra.is_empty() {
        return;
    }
    let extra = serde_json::Value::Object(std::mem::take(&mut edge.extra));
    if let serde_json::Value::Object(map) = tables.entities.replace_in_json(&extra) {
        edge.extra = map;
    }
}

/// Rewrite a whole canvas state.
///
/// Nodes referencing an entity or storage key in `failed` (sources whose
/// copy did not succeed) are removed together with their edges, so the new
/// graph never points at an entity of the source canvas.
pub fn rewrite_state(state: &mut CanvasState, tables: RewriteTables<'_>, failed: &HashSet<String>) {
    if !failed.is_empty() {
        let dropped: HashSet<String> = state
            .nodes
            .iter()
            .filter(|n| {
                n.entity_ref().is_some_and(|(_, id)| failed.contains(id))
                    || n.data.metadata.storage_key.as_ref().is_some_and(|k| failed.contains(k))
            })
            .map(|n| n.id.clone())
            .collect();
        state.remove_nodes(&dropped);
    }
    for node in state.nodes.iter_mut() {
        rewrite_node(node, tables);
    }
    for edge in state.edges.iter_mut() {
        rewrite_edge(edge, tables);
    }
}

fn references_any(resource: &VariableResource, ids: &HashSet<String>) -> bool {
    [&resource.file_id, &resource.entity_id, &resource.storage_key]
        .into_iter()
        .flatten()
        .any(|id| ids.contains(id))
}

/// Rewrite file/entity references of resource-type variable values.
///
/// Values referencing an ID or storage key in `dropped` (sources that were
/// not copied) are removed from their variable.
pub fn rewrite_variables(
    variables: &mut [WorkflowVariable],
    tables: RewriteTables<'_>,
    dropped: &HashSet<String>,
) {
    for variable in variables.iter_mut() {
        if !dropped.is_empty() {
            variable.value.retain(|value| {
                !value
                    .resource
                    .as_ref()
                    .is_some_and(|resource| references_any(resource, dropped))
            });
        }
        for value in variable.value.iter_mut() {
            let Some(resource) = value.resource.as_mut() else {
                continue;
            };
            if let Some(file_id) = resource.file_id.as_ref() {
                resource.file_id = Some(tables.entities.resolve(file_id).to_string());
            }
            if let Some(entity_id) = resource.entity_id.as_ref() {
                resource.entity_id = Some(tables.entities.resolve(entity_id).to_string());
            }
            if let Some(key) = resource.storage_key.as_ref() {
                resource.storage_key = Some(tables.storage_keys.resolve(key).to_string());
            }
        }
    }
}

/// Rewrite a workflow blob that does not parse as a typed workflow, by
/// whole-token substitution of storage keys and then entity IDs. Keys go
/// first because they embed canvas IDs.
pub fn rewrite_raw_workflow(raw: &serde_json::Value, tables: RewriteTables<'_>) -> serde_json::Value {
    tables
        .entities
        .replace_in_json(&tables.storage_keys.replace_in_json(raw))
}

/// Collect every old ID of `table` still present anywhere in `state` or
/// `variables`. Empty when the rewrite was complete.
pub fn stale_references(
    state: &CanvasState,
    variables: &[WorkflowVariable],
    table: &RemapTable,
) -> Vec<String> {
    let marker = RemapTable::from_iter(
        table
            .old_ids()
            .map(|id| (id.to_string(), format!("\u{0}{id}\u{0}"))),
    );
    let mut stale = HashSet::new();
    let serialized = [
        serde_json::to_string(state).unwrap_or_default(),
        serde_json::to_string(variables).unwrap_or_default(),
    ];
    for text in &serialized {
        let marked = marker.replace_in_text(text);
        for (i, part) in marked.split('\u{0}').enumerate() {
            if i % 2 == 1 && table.contains(part) {
                stale.insert(part.to_string());
            }
        }
    }
    let mut stale: Vec<String> = stale.into_iter().collect();
    stale.sort();
    stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasEdge, NodeType, SelectedToolset};
    use crate::workflow::{VariableResource, VariableValue};
    use serde_json::{json, Map};

    fn table(pairs: &[(&str, &str)]) -> RemapTable {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    fn skill_node() -> CanvasNode {
        let mut node = CanvasNode::new("n-skill", NodeType::SkillResponse, "ar-1");
        node.data.metadata.context_items = Some(json!([
            { "entityId": "d-1", "type": "document" },
            { "entityId": "external-7", "type": "website" }
        ]));
        node.data.metadata.structured_data = Some(json!({ "query": "use r-1 please" }));
        node.data.metadata.selected_toolsets = Some(vec![SelectedToolset {
            id: "ts-1".into(),
            toolset_type: Some("regular".into()),
            name: None,
            extra: Map::new(),
        }]);
        node
    }

    #[test]
    fn rewrites_entity_ids_blobs_and_toolsets() {
        let entities = table(&[("ar-1", "ar-2"), ("d-1", "d-2"), ("r-1", "r-2")]);
        let toolsets = table(&[("ts-1", "ts-9")]);
        let empty = RemapTable::new();
        let tables = RewriteTables {
            entities: &entities,
            toolsets: &toolsets,
            storage_keys: &empty,
        };

        let mut node = skill_node();
        rewrite_node(&mut node, tables);

        assert_eq!(node.data.entity_id, "ar-2");
        let items = node.data.metadata.context_items.as_ref().unwrap();
        assert_eq!(items[0]["entityId"], "d-2");
        assert_eq!(items[1]["entityId"], "external-7");
        assert_eq!(
            node.data.metadata.structured_data.as_ref().unwrap()["query"],
            "use r-2 please"
        );
        assert_eq!(node.data.metadata.selected_toolsets.as_ref().unwrap()[0].id, "ts-9");
    }

    #[test]
    fn failed_entities_are_dropped_with_their_edges() {
        let entities = table(&[("d-1", "d-2")]);
        let empty = RemapTable::new();
        let mut state = CanvasState::new(
            vec![
                CanvasNode::new("a", NodeType::Document, "d-1"),
                CanvasNode::new("b", NodeType::Resource, "r-1"),
            ],
            vec![CanvasEdge::new("e", "a", "b")],
        );
        let failed: HashSet<String> = ["r-1".to_string()].into_iter().collect();
        rewrite_state(&mut state, RewriteTables::entities_only(&entities, &empty), &failed);

        assert_eq!(state.nodes.len(), 1);
        assert_eq!(state.nodes[0].data.entity_id, "d-2");
        assert!(state.edges.is_empty());
    }

    #[test]
    fn variables_follow_file_and_key_remaps() {
        let entities = table(&[("df-1", "df-2")]);
        let keys = table(&[("drive/u/c-1/a.pdf", "drive/u/c-2/a.pdf")]);
        let empty = RemapTable::new();
        let mut vars = vec![WorkflowVariable {
            variable_id: "v".into(),
            name: "file".into(),
            value: vec![
                VariableValue::resource(VariableResource {
                    file_id: Some("df-1".into()),
                    storage_key: Some("drive/u/c-1/a.pdf".into()),
                    ..VariableResource::default()
                }),
                VariableValue::text("df-1 stays as text"),
            ],
            variable_type: Some("resource".into()),
            extra: Map::new(),
        }];
        rewrite_variables(
            &mut vars,
            RewriteTables {
                entities: &entities,
                toolsets: &empty,
                storage_keys: &keys,
            },
            &HashSet::new(),
        );
        let res = vars[0].value[0].resource.as_ref().unwrap();
        assert_eq!(res.file_id.as_deref(), Some("df-2"));
        assert_eq!(res.storage_key.as_deref(), Some("drive/u/c-2/a.pdf"));
        assert_eq!(vars[0].value[1].text.as_deref(), Some("df-1 stays as text"));
    }

    #[test]
    fn values_of_uncopied_files_are_dropped() {
        let entities = table(&[("df-2", "df-20")]);
        let empty = RemapTable::new();
        let file = |id: &str, key: &str| {
            VariableValue::resource(VariableResource {
                file_id: Some(id.into()),
                storage_key: Some(key.into()),
                ..VariableResource::default()
            })
        };
        let mut vars = vec![WorkflowVariable {
            variable_id: "v".into(),
            name: "files".into(),
            value: vec![
                file("df-1", "drive/u/c-1/a.pdf"),
                file("df-2", "drive/u/c-1/b.pdf"),
                VariableValue::text("notes"),
            ],
            variable_type: Some("resource".into()),
            extra: Map::new(),
        }];
        let dropped: HashSet<String> = ["df-1".to_string(), "drive/u/c-1/a.pdf".to_string()]
            .into_iter()
            .collect();

        rewrite_variables(&mut vars, RewriteTables::entities_only(&entities, &empty), &dropped);

        assert_eq!(vars[0].value.len(), 2);
        let res = vars[0].value[0].resource.as_ref().unwrap();
        assert_eq!(res.file_id.as_deref(), Some("df-20"));
        assert_eq!(vars[0].value[1].text.as_deref(), Some("notes"));
    }

    #[test]
    fn raw_workflow_is_rewritten_token_by_token() {
        let entities = table(&[("df-1", "df-2"), ("c-1", "c-2")]);
        let keys = table(&[("drive/u/c-1/df-1-a.pdf", "drive/u/c-2/df-2-a.pdf")]);
        let empty = RemapTable::new();
        let raw = json!({
            "variables": [{ "fileId": "df-1", "storageKey": "drive/u/c-1/df-1-a.pdf" }],
            "layout": "grid"
        });

        let rewritten = rewrite_raw_workflow(
            &raw,
            RewriteTables {
                entities: &entities,
                toolsets: &empty,
                storage_keys: &keys,
            },
        );

        assert_eq!(rewritten["variables"][0]["fileId"], "df-2");
        assert_eq!(rewritten["variables"][0]["storageKey"], "drive/u/c-2/df-2-a.pdf");
        assert_eq!(rewritten["layout"], "grid");
    }

    #[test]
    fn stale_reference_scan_finds_leftovers() {
        let entities = table(&[("d-1", "d-2"), ("r-1", "r-2")]);
        let state = CanvasState::new(
            vec![
                CanvasNode::new("a", NodeType::Document, "d-2"),
                CanvasNode::new("b", NodeType::Resource, "r-1"),
            ],
            vec![],
        );
        assert_eq!(stale_references(&state, &[], &entities), vec!["r-1".to_string()]);
    }
}
