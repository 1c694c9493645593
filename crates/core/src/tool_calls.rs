//! Deterministic tool-call ID regeneration for duplicated skill responses.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::ids::TOOL_CALL_PREFIX;
use crate::remap::RemapTable;

/// Number of hex characters of the digest kept in a tool-call ID.
const CALL_ID_HEX_LEN: usize = 24;

/// Derive a tool-call ID from the owning result, its version, the toolset and
/// tool, and the ordinal of this (toolset, tool) pair within the result.
pub fn tool_call_id(
    result_id: &str,
    version: i32,
    toolset_id: &str,
    tool_name: &str,
    ordinal: usize,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{result_id}:{version}:{toolset_id}:{tool_name}:{ordinal}"));
    let hash = hasher.finalize();
    let hex = format!("{hash:x}");
    format!("{TOOL_CALL_PREFIX}{}", &hex[..CALL_ID_HEX_LEN])
}

/// Minimal view of a tool call needed to regenerate its ID.
#[derive(Debug, Clone, Copy)]
pub struct ToolCallRef<'a> {
    pub call_id: &'a str,
    pub toolset_id: &'a str,
    pub tool_name: &'a str,
}

/// Build the `old call id → new call id` table for a duplicated result.
///
/// Calls are numbered per (toolset, tool) pair in input order, so repeated
/// invocations of the same tool get distinct IDs.
pub fn remap_tool_call_ids<'a>(
    new_result_id: &str,
    version: i32,
    calls: impl IntoIterator<Item = ToolCallRef<'a>>,
) -> RemapTable {
    let mut ordinals: HashMap<(&str, &str), usize> = HashMap::new();
    let mut table = RemapTable::new();
    for call in calls {
        let ordinal = ordinals.entry((call.toolset_id, call.tool_name)).or_insert(0);
        let new_id = tool_call_id(
            new_result_id,
            version,
            call.toolset_id,
            call.tool_name,
            *ordinal,
        );
        *ordinal += 1;
        table.insert(call.call_id, new_id);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call<'a>(id: &'a str, toolset: &'a str, tool: &'a str) -> ToolCallRef<'a> {
        ToolCallRef {
            call_id: id,
            toolset_id: toolset,
            tool_name: tool,
        }
    }

    #[test]
    fn formula_is_deterministic() {
        let a = tool_call_id("ar-1", 0, "ts-1", "search", 0);
        let b = tool_call_id("ar-1", 0, "ts-1", "search", 0);
        assert_eq!(a, b);
        assert!(a.starts_with("tc-"));
        assert_eq!(a.len(), 3 + CALL_ID_HEX_LEN);
    }

    #[test]
    fn every_key_component_changes_the_id() {
        let base = tool_call_id("ar-1", 0, "ts-1", "search", 0);
        assert_ne!(base, tool_call_id("ar-2", 0, "ts-1", "search", 0));
        assert_ne!(base, tool_call_id("ar-1", 1, "ts-1", "search", 0));
        assert_ne!(base, tool_call_id("ar-1", 0, "ts-2", "search", 0));
        assert_ne!(base, tool_call_id("ar-1", 0, "ts-1", "fetch", 0));
        assert_ne!(base, tool_call_id("ar-1", 0, "ts-1", "search", 1));
    }

    #[test]
    fn repeated_tool_calls_get_distinct_ids() {
        let table = remap_tool_call_ids(
            "ar-new",
            0,
            vec![
                call("old-1", "ts-1", "search"),
                call("old-2", "ts-1", "search"),
                call("old-3", "ts-2", "search"),
            ],
        );
        assert_eq!(table.len(), 3);
        let new_ids: std::collections::HashSet<&str> = table.new_ids().collect();
        assert_eq!(new_ids.len(), 3);
        assert!(!new_ids.contains("old-1"));
    }
}
