//! Per-run state and loop phases.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::decision::Decision;

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ask the model for the next decision.
    Plan,
    /// Execute the pending tool decision.
    Act,
    /// Count the completed Act and enforce the step budget.
    LimitCheck,
    /// Done; the decision holds the answer.
    Terminal,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model produced a final answer.
    Answered,
    /// The step budget ran out.
    StepLimit,
    /// The model call failed.
    ModelFailure,
    /// The model output could not be parsed or validated.
    InvalidDecision,
    /// Terminal was reached without a final decision.
    NoDecision,
    /// Nothing to answer.
    EmptyConversation,
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub observation: Value,
}

/// State owned by exactly one run.
///
/// The scratchpad is append-only and `steps` only grows.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub scratchpad: String,
    pub steps: u32,
    pub decision: Option<Decision>,
    pub termination: Option<Termination>,
    pub last_tool_name: Option<String>,
    pub last_tool_result: Option<Value>,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `CALL`/`OBS` pair and remember the call.
    pub fn record_observation(&mut self, name: &str, arguments: Map<String, Value>, observation: Value) {
        let args_json = Value::Object(arguments.clone()).to_string();
        self.scratchpad
            .push_str(&format!("\nCALL {name} args={args_json}\nOBS {observation}\n"));
        self.last_tool_name = Some(name.to_string());
        self.last_tool_result = Some(observation.clone());
        self.tool_calls.push(ToolCallRecord {
            name: name.to_string(),
            arguments,
            observation,
        });
    }

    /// Replace the decision with a loop-generated final answer.
    pub fn force_final(&mut self, text: impl Into<String>, termination: Termination) {
        self.decision = Some(Decision::Final { text: text.into() });
        self.termination = Some(termination);
    }
}
