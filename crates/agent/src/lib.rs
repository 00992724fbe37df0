//! The tool-use agent loop.
//!
//! A run follows a **Plan → Act → LimitCheck** cycle:
//!
//! 1. **Flatten** the conversation into a single question
//! 2. **List tools** from the tool source and build the catalog
//! 3. **Plan**: prompt the model for one JSON decision
//! 4. **Act**: if the decision names a tool, invoke it and append the observation
//! 5. **LimitCheck**: count the step and loop back to Plan while budget remains
//!
//! The loop ends on a final decision, an unusable model reply, or the step
//! limit. It always produces an answer string.

pub mod catalog;
pub mod config;
pub mod decision;
pub mod prompt;
pub mod runner;
pub mod state;
pub mod transcript;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use catalog::{ToolCatalog, ToolDescriptor};
pub use config::{RunConfig, RunConfigBuilder, RunConfigError};
pub use decision::{Decision, DecisionError, parse_decision};
pub use prompt::build_decision_prompt;
pub use runner::{NO_DECISION_MESSAGE, RunOutcome, STEP_LIMIT_MESSAGE, run, run_detailed};
pub use state::{AgentState, Phase, Termination, ToolCallRecord};
