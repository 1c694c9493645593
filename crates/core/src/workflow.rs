//! Workflow blob stored alongside a canvas (`canvases.workflow`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// File reference carried by a resource-type variable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValue {
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<VariableResource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VariableValue {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            value_type: "text".into(),
            text: Some(text.into()),
            resource: None,
            extra: Map::new(),
        }
    }

    pub fn resource(resource: VariableResource) -> Self {
        Self {
            value_type: "resource".into(),
            text: None,
            resource: Some(resource),
            extra: Map::new(),
        }
    }
}

/// A named, typed placeholder in a canvas workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowVariable {
    pub variable_id: String,
    pub name: String,
    #[serde(default)]
    pub value: Vec<VariableValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The `workflow` JSON column of a canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub variables: Vec<WorkflowVariable>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    /// Parse the stored column. A null column is an empty workflow; a blob
    /// that does not fit the typed shape is an error so callers never write
    /// back a truncated workflow.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
