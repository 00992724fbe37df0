//! The orchestration loop: Plan → Act → LimitCheck → Terminal.
//!
//! ```text
//!          ┌──────────── steps < max ────────────┐
//!          ▼                                     │
//!        Plan ── tool ──► Act ──► LimitCheck ────┘
//!          │                          │
//!   final / failure            steps >= max
//!          ▼                          ▼
//!       Terminal ◄────────────────────┘
//! ```
//!
//! Every failure is converted where it happens: model and parse failures
//! force a final answer, tool failures become observations. A run always
//! returns text.

use serde_json::{Value, json};
use subserver_core::message::{Message, truncate_chars};
use subserver_core::provider::ProviderRequest;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::ToolCatalog;
use crate::config::RunConfig;
use crate::decision::{Decision, parse_decision};
use crate::prompt::build_decision_prompt;
use crate::state::{AgentState, Phase, Termination, ToolCallRecord};
use crate::transcript;

/// Answer substituted when the step budget runs out.
pub const STEP_LIMIT_MESSAGE: &str = "Reached the maximum number of steps and cannot keep calling tools. \
Please narrow the question or reduce how many tool calls it needs.";

/// Answer substituted when Terminal is reached without a final decision.
pub const NO_DECISION_MESSAGE: &str = "Sorry, the agent did not produce a valid answer.";

const RAW_LOG_CHARS: usize = 500;
const DIAGNOSTIC_CHARS: usize = 200;

fn model_failure_message(error: &str) -> String {
    format!(
        "Sorry, the AI call failed: {}. Please check that the main server is running.",
        truncate_chars(error, DIAGNOSTIC_CHARS)
    )
}

fn invalid_decision_message(error: &str) -> String {
    format!(
        "Sorry, the AI returned an invalid response format ({}).",
        truncate_chars(error, DIAGNOSTIC_CHARS)
    )
}

/// The answer plus everything needed to audit how it was reached.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub scratchpad: String,
    pub steps: u32,
    pub tool_calls: Vec<ToolCallRecord>,
    pub termination: Termination,
}

/// Run the agent over `conversation` and return the final answer.
pub async fn run(conversation: &[Message], config: &RunConfig) -> String {
    run_detailed(conversation, config).await.answer
}

/// Like [`run`], but also returns the trace.
pub async fn run_detailed(conversation: &[Message], config: &RunConfig) -> RunOutcome {
    let question = transcript::flatten(conversation);
    if question.is_empty() {
        return RunOutcome {
            answer: String::new(),
            scratchpad: String::new(),
            steps: 0,
            tool_calls: Vec::new(),
            termination: Termination::EmptyConversation,
        };
    }

    let catalog = if config.use_tools() {
        ToolCatalog::fetch(config.tools(), config.max_tools()).await
    } else {
        ToolCatalog::empty()
    };

    let run = Run {
        id: Uuid::new_v4(),
        question,
        catalog,
        config,
    };
    info!(
        run_id = %run.id,
        model = config.model(),
        tools = run.catalog.len(),
        max_steps = config.max_steps(),
        "Agent run starting"
    );

    let state = run.drive().await;
    let (answer, termination) = match state.decision {
        Some(Decision::Final { text }) => (text, state.termination.unwrap_or(Termination::Answered)),
        _ => {
            warn!(run_id = %run.id, "Run ended without a final decision");
            (NO_DECISION_MESSAGE.to_string(), Termination::NoDecision)
        }
    };

    info!(
        run_id = %run.id,
        steps = state.steps,
        tool_calls = state.tool_calls.len(),
        termination = ?termination,
        "Agent run finished"
    );

    RunOutcome {
        answer,
        scratchpad: state.scratchpad,
        steps: state.steps,
        tool_calls: state.tool_calls,
        termination,
    }
}

/// Immutable inputs of one run.
struct Run<'a> {
    id: Uuid,
    question: String,
    catalog: ToolCatalog,
    config: &'a RunConfig,
}

impl Run<'_> {
    async fn drive(&self) -> AgentState {
        let mut phase = Phase::Plan;
        let mut state = AgentState::new();
        while phase != Phase::Terminal {
            (phase, state) = self.step(phase, state).await;
        }
        state
    }

    async fn step(&self, phase: Phase, state: AgentState) -> (Phase, AgentState) {
        match phase {
            Phase::Plan => self.plan(state).await,
            Phase::Act => self.act(state).await,
            Phase::LimitCheck => self.limit_check(state),
            Phase::Terminal => (Phase::Terminal, state),
        }
    }

    async fn plan(&self, mut state: AgentState) -> (Phase, AgentState) {
        let prompt = build_decision_prompt(&self.question, &self.catalog, &state.scratchpad);
        let mut request = ProviderRequest::single_turn(self.config.model(), prompt)
            .with_temperature(self.config.temperature());
        if let Some(max_tokens) = self.config.max_tokens() {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(timeout) = self.config.timeout() {
            request = request.with_timeout(timeout);
        }

        let raw = match self.config.provider().complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(run_id = %self.id, error = %e, "Model call failed");
                state.force_final(model_failure_message(&e.to_string()), Termination::ModelFailure);
                return (Phase::Terminal, state);
            }
        };

        let raw = raw.trim();
        if self.config.verbose() {
            info!(run_id = %self.id, step = state.steps, raw = truncate_chars(raw, RAW_LOG_CHARS), "Model output");
        } else {
            debug!(run_id = %self.id, step = state.steps, raw = truncate_chars(raw, RAW_LOG_CHARS), "Model output");
        }

        match parse_decision(raw, &self.catalog) {
            Ok(decision) => {
                state.decision = Some(decision);
                self.route(state)
            }
            Err(e) => {
                warn!(
                    run_id = %self.id,
                    error = %e,
                    raw = truncate_chars(raw, DIAGNOSTIC_CHARS),
                    "Invalid decision from model"
                );
                state.force_final(invalid_decision_message(&e.to_string()), Termination::InvalidDecision);
                (Phase::Terminal, state)
            }
        }
    }

    fn route(&self, mut state: AgentState) -> (Phase, AgentState) {
        match state.decision {
            Some(Decision::Tool { .. }) if state.steps < self.config.max_steps() => (Phase::Act, state),
            Some(Decision::Tool { .. }) => {
                state.force_final(STEP_LIMIT_MESSAGE, Termination::StepLimit);
                (Phase::Terminal, state)
            }
            _ => (Phase::Terminal, state),
        }
    }

    async fn act(&self, mut state: AgentState) -> (Phase, AgentState) {
        let Some(Decision::Tool { name, arguments }) = state.decision.clone() else {
            return (Phase::Terminal, state);
        };

        debug!(run_id = %self.id, tool = %name, "Invoking tool");
        let observation = match self.config.tools().invoke_tool(&name, &arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(run_id = %self.id, tool = %name, error = %e, "Tool invocation failed");
                json!({"success": false, "error": e.to_string()})
            }
        };

        if observation.get("success") == Some(&Value::Bool(false)) {
            debug!(run_id = %self.id, tool = %name, "Tool reported failure");
        }
        state.record_observation(&name, arguments, observation);
        (Phase::LimitCheck, state)
    }

    fn limit_check(&self, mut state: AgentState) -> (Phase, AgentState) {
        state.steps += 1;
        if state.steps >= self.config.max_steps() {
            info!(run_id = %self.id, steps = state.steps, "Step budget exhausted");
            state.force_final(STEP_LIMIT_MESSAGE, Termination::StepLimit);
            (Phase::Terminal, state)
        } else {
            (Phase::Plan, state)
        }
    }
}
