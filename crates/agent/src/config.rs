//! Per-request run configuration.

use std::sync::Arc;
use std::time::Duration;
use subserver_core::provider::Provider;
use subserver_core::tool::ToolSource;
use thiserror::Error;

pub const DEFAULT_MAX_STEPS: u32 = 6;
pub const DEFAULT_MAX_TOOLS: usize = 40;
const DEFAULT_MODEL: &str = "gptgod";
const DEFAULT_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunConfigError {
    #[error("max_steps must be at least 1")]
    ZeroSteps,
}

/// Everything one agent run needs: parameters and the two collaborators.
///
/// Immutable once built; build one per request.
#[derive(Clone)]
pub struct RunConfig {
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_steps: u32,
    max_tools: usize,
    verbose: bool,
    use_tools: bool,
    timeout: Option<Duration>,
    provider: Arc<dyn Provider>,
    tools: Arc<dyn ToolSource>,
}

impl RunConfig {
    pub fn builder(provider: Arc<dyn Provider>, tools: Arc<dyn ToolSource>) -> RunConfigBuilder {
        RunConfigBuilder {
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            max_steps: DEFAULT_MAX_STEPS,
            max_tools: DEFAULT_MAX_TOOLS,
            verbose: false,
            use_tools: true,
            timeout: None,
            provider,
            tools,
        }
    }

    /// Model or provider identifier forwarded upstream.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn max_tools(&self) -> usize {
        self.max_tools
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn use_tools(&self) -> bool {
        self.use_tools
    }

    /// Per model call timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn tools(&self) -> &dyn ToolSource {
        self.tools.as_ref()
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_steps", &self.max_steps)
            .field("max_tools", &self.max_tools)
            .field("verbose", &self.verbose)
            .field("use_tools", &self.use_tools)
            .field("timeout", &self.timeout)
            .field("provider", &self.provider.name())
            .finish()
    }
}

pub struct RunConfigBuilder {
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_steps: u32,
    max_tools: usize,
    verbose: bool,
    use_tools: bool,
    timeout: Option<Duration>,
    provider: Arc<dyn Provider>,
    tools: Arc<dyn ToolSource>,
}

impl RunConfigBuilder {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Cap on tools surfaced to the model; 0 surfaces all.
    pub fn with_max_tools(mut self, max_tools: usize) -> Self {
        self.max_tools = max_tools;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_tools_enabled(mut self, use_tools: bool) -> Self {
        self.use_tools = use_tools;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Only the step budget is checked here; the upstream model judges
    /// temperature and model identity.
    pub fn build(self) -> Result<RunConfig, RunConfigError> {
        if self.max_steps == 0 {
            return Err(RunConfigError::ZeroSteps);
        }

        Ok(RunConfig {
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_steps: self.max_steps,
            max_tools: self.max_tools,
            verbose: self.verbose,
            use_tools: self.use_tools,
            timeout: self.timeout,
            provider: self.provider,
            tools: self.tools,
        })
    }
}
