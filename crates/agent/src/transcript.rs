//! Conversation → plain-text question.

use subserver_core::message::Message;

/// Render a conversation as `"<role>: <content>"` lines.
///
/// An empty conversation yields an empty string.
pub fn flatten(conversation: &[Message]) -> String {
    conversation
        .iter()
        .map(|m| format!("{}: {}", m.role(), m.text()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
