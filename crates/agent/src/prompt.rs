//! The decision prompt sent to the model on every Plan step.

use crate::catalog::ToolCatalog;

const NONE: &str = "(none)";

/// Build the instruction prompt for one planning step.
///
/// Pure and deterministic: the same inputs always produce the same text.
pub fn build_decision_prompt(question: &str, catalog: &ToolCatalog, scratchpad: &str) -> String {
    let tools_desc = if catalog.is_empty() {
        NONE.to_string()
    } else {
        catalog
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.rendered_description()))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let tool_names = if catalog.is_empty() {
        NONE.to_string()
    } else {
        catalog.names().join(", ")
    };

    format!(
        r#"You are a tool-orchestrating AI. Solve the problem in as few steps as possible.

Available tools:
{tools_desc}

You must output JSON only, with no other text before or after it.

To call a tool, output:
{{"type":"tool","name":"<tool_name>","args":{{...}}}}

When you can answer directly, output:
{{"type":"final","final":"..."}}

Rules:
- Only these tool names are allowed: {tool_names}
- args must be a JSON object
- If a tool returns success=false, do not repeat the same call; try another approach or give a workable alternative

Question:
{question}

Progress so far (for reference, do not repeat it in your output):
{scratchpad}
"#
    )
}
