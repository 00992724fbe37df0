//! Conversation message value objects.
//!
//! Chat clients send messages whose `content` may be a plain string, a
//! structured object, or an array of typed parts. These types accept all of
//! them and know how to render each one as plain text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message in an incoming conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message. Absent or blank means `user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Text or structured content.
    #[serde(default)]
    pub content: Value,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            role: Some(role.into()),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", Value::String(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", Value::String(content.into()))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", Value::String(content.into()))
    }

    /// The effective role, trimmed, with `user` as the fallback.
    pub fn role(&self) -> &str {
        match self.role.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => "user",
        }
    }

    /// The content rendered as plain text.
    pub fn text(&self) -> String {
        flatten_content(&self.content)
    }
}

/// Render a message content value as plain text.
///
/// - string: itself
/// - null: empty
/// - object: the first non-empty string among `text`, `content`; else compact JSON
/// - array: the `text` fields of its parts joined by newlines; else compact JSON
/// - other scalars: their JSON text
pub fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => ["text", "content"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| content.to_string()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .collect();
            if texts.is_empty() {
                content.to_string()
            } else {
                texts.join("\n")
            }
        }
        other => other.to_string(),
    }
}

/// The first `max_chars` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
