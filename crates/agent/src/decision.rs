//! Decision protocol: untrusted model text → typed [`Decision`].
//!
//! The model answers with one of two JSON shapes:
//!
//! ```text
//! {"type":"tool","name":"<tool_name>","args":{...}}
//! {"type":"final","final":"..."}
//! ```
//!
//! The object may be wrapped in a fenced code block or surrounded by prose.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::ToolCatalog;

/// What the model decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Invoke a catalog tool with an argument object.
    Tool { name: String, arguments: Map<String, Value> },
    /// Stop and answer.
    Final { text: String },
}

/// Why model output could not be turned into a decision.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    #[error("empty model output")]
    EmptyOutput,

    #[error("output is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("output is not a JSON object")]
    NotAnObject,

    #[error("tool not allowed: {0}")]
    ToolNotAllowed(String),

    #[error("args must be a JSON object")]
    ArgsNotObject,

    #[error("type must be 'tool' or 'final', got '{0}'")]
    UnknownDecisionType(String),
}

/// The text of the first fenced block, with an optional `json` tag removed.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let mut rest = &text[open + 3..];
    if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
        rest = &rest[4..];
    }
    let close = rest.find("```")?;
    Some(rest[..close].trim())
}

/// Greedy span from the first `{` to the last `}`.
fn braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Locate the JSON candidate inside raw model output.
///
/// Output that already is a JSON object is used as-is, so fences inside its
/// string values are never mistaken for a wrapper.
pub fn extract_json_candidate(raw: &str) -> Result<&str, DecisionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(DecisionError::EmptyOutput);
    }
    if text.starts_with('{') && serde_json::from_str::<Map<String, Value>>(text).is_ok() {
        return Ok(text);
    }
    let text = fenced_block(text).unwrap_or(text);
    if text.starts_with('{') {
        return Ok(text);
    }
    Ok(braced_span(text).unwrap_or(text))
}

/// Strings as-is, null as empty, anything else as compact JSON.
fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse and validate raw model output against the current catalog.
///
/// A tool decision must name a catalog entry; an empty catalog therefore
/// rejects every tool decision.
pub fn parse_decision(raw: &str, catalog: &ToolCatalog) -> Result<Decision, DecisionError> {
    let candidate = extract_json_candidate(raw)?;
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| DecisionError::MalformedJson(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(DecisionError::NotAnObject);
    };

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match kind.as_str() {
        "final" => Ok(Decision::Final {
            text: value_text(obj.get("final")),
        }),
        "tool" => {
            let name = value_text(obj.get("name")).trim().to_string();
            if !catalog.contains(&name) {
                return Err(DecisionError::ToolNotAllowed(name));
            }
            let arguments = match obj.get("args") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(args)) => args.clone(),
                Some(_) => return Err(DecisionError::ArgsNotObject),
            };
            Ok(Decision::Tool { name, arguments })
        }
        _ => Err(DecisionError::UnknownDecisionType(kind)),
    }
}
