//! Old-ID → new-ID substitution table used by duplication and sharing.
//!
//! The table is filled completely before any dependent write happens; the
//! rewrite pass only ever reads it. Textual substitution is restricted to
//! whole ID tokens, so an ID that merely contains a mapped key is never
//! touched.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::canvas::CanvasNode;
use crate::ids::{gen_entity_id, is_id_char};

/// Upper bound for the compiled alternation of all mapped IDs.
const MATCHER_SIZE_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct RemapTable {
    map: HashMap<String, String>,
    matcher: OnceLock<Option<Regex>>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `old → new`. Returns the previous mapping for `old`, if any.
    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) -> Option<String> {
        self.matcher = OnceLock::new();
        self.map.insert(old.into(), new.into())
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.map.get(old).map(String::as_str)
    }

    pub fn contains(&self, old: &str) -> bool {
        self.map.contains_key(old)
    }

    /// The new ID for `id`, or `id` itself when it is not mapped.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).unwrap_or(id)
    }

    /// Merge every entry of `other` into this table (entries in `other` win).
    pub fn merge(&mut self, other: &RemapTable) {
        if other.is_empty() {
            return;
        }
        self.matcher = OnceLock::new();
        for (old, new) in &other.map {
            self.map.insert(old.clone(), new.clone());
        }
    }

    pub fn remove(&mut self, old: &str) -> Option<String> {
        self.matcher = OnceLock::new();
        self.map.remove(old)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn old_ids(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn new_ids(&self) -> impl Iterator<Item = &str> {
        self.map.values().map(String::as_str)
    }

    /// Alternation of every mapped key, longest first so overlapping keys
    /// resolve to the longest token.
    fn matcher(&self) -> Option<&Regex> {
        self.matcher
            .get_or_init(|| {
                if self.map.is_empty() {
                    return None;
                }
                let mut keys: Vec<&String> = self.map.keys().filter(|k| !k.is_empty()).collect();
                keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
                let pattern = keys
                    .iter()
                    .map(|k| regex::escape(k))
                    .collect::<Vec<_>>()
                    .join("|");
                RegexBuilder::new(&pattern)
                    .size_limit(MATCHER_SIZE_LIMIT)
                    .build()
                    .ok()
            })
            .as_ref()
    }

    /// Replace every whole-token occurrence of a mapped ID inside `text`.
    pub fn replace_in_text(&self, text: &str) -> String {
        let Some(matcher) = self.matcher() else {
            return text.to_string();
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in matcher.find_iter(text) {
            let left_ok = text[..m.start()]
                .chars()
                .next_back()
                .map_or(true, |c| !is_id_char(c));
            let right_ok = text[m.end()..]
                .chars()
                .next()
                .map_or(true, |c| !is_id_char(c));
            if !(left_ok && right_ok) {
                continue;
            }
            if let Some(new) = self.map.get(m.as_str()) {
                out.push_str(&text[last..m.start()]);
                out.push_str(new);
                last = m.end();
            }
        }
        out.push_str(&text[last..]);
        out
    }

    /// Token-replace inside an opaque JSON value by rewriting its serialized
    /// form. Values that fail to re-parse are returned unchanged.
    pub fn replace_in_json(&self, value: &Value) -> Value {
        if self.is_empty() {
            return value.clone();
        }
        let Ok(serialized) = serde_json::to_string(value) else {
            return value.clone();
        };
        let replaced = self.replace_in_text(&serialized);
        if replaced == serialized {
            return value.clone();
        }
        serde_json::from_str(&replaced).unwrap_or_else(|_| value.clone())
    }
}

impl PartialEq for RemapTable {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl FromIterator<(String, String)> for RemapTable {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            map: iter.into_iter().collect(),
            matcher: OnceLock::new(),
        }
    }
}

/// Pre-assign new IDs for every duplicable entity node plus the canvas root.
///
/// Nodes sharing an entity ID share the new ID. Nodes without an entity ID
/// are skipped.
pub fn build_duplication_remap(
    nodes: &[CanvasNode],
    old_canvas_id: &str,
    new_canvas_id: &str,
) -> RemapTable {
    let mut table = RemapTable::new();
    table.insert(old_canvas_id, new_canvas_id);
    for node in nodes {
        if let Some((entity_type, entity_id)) = node.entity_ref() {
            if !table.contains(entity_id) {
                table.insert(entity_id, gen_entity_id(entity_type));
            }
        }
    }
    table
}
