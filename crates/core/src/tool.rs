//! Tool source trait: the abstraction over externally hosted tools.
//!
//! The subserver does not implement tools itself. A `ToolSource` lists the
//! tools some other service exposes and invokes them by name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// A raw tool record as returned by a listing endpoint.
///
/// Every field is optional; unknown fields are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the arguments, usually `{"type":"object","properties":{...}}`.
    #[serde(
        default,
        rename = "inputSchema",
        alias = "input_schema",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Property keys of the input schema, in schema order.
    pub fn argument_keys(&self) -> Vec<String> {
        self.input_schema
            .as_ref()
            .and_then(|schema| schema.get("properties"))
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Lists and invokes tools hosted elsewhere.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Fetch the current tool records.
    async fn list_tools(&self) -> std::result::Result<Vec<ToolRecord>, ToolError>;

    /// Invoke a tool by name. The returned value is the tool's JSON result,
    /// which by convention carries a `success` flag.
    async fn invoke_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> std::result::Result<Value, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_parses_camel_case_schema_and_keeps_extra() {
        let record: ToolRecord = serde_json::from_value(json!({
            "name": "weather.now",
            "description": "Current weather",
            "inputSchema": {"type": "object", "properties": {"city": {}, "unit": {}}},
            "server": "weather"
        }))
        .unwrap();
        assert_eq!(record.name.as_deref(), Some("weather.now"));
        assert_eq!(record.argument_keys(), vec!["city", "unit"]);
        assert_eq!(record.extra.get("server"), Some(&json!("weather")));
    }

    #[test]
    fn record_accepts_snake_case_alias() {
        let record: ToolRecord = serde_json::from_value(json!({
            "name": "x",
            "input_schema": {"properties": {"a": {}}}
        }))
        .unwrap();
        assert_eq!(record.argument_keys(), vec!["a"]);
    }

    #[test]
    fn argument_keys_without_schema_is_empty() {
        let record = ToolRecord::new("t", "d");
        assert!(record.argument_keys().is_empty());
        let bad = ToolRecord::new("t", "d").with_schema(json!({"properties": []}));
        assert!(bad.argument_keys().is_empty());
    }
}
