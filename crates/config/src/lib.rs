//! Configuration loading, validation, and management for the subserver.
//!
//! Loads configuration from `$SUBSERVER_CONFIG` or `~/.subserver/config.toml`
//! with environment variable overrides. Every field has a default, so a
//! partial file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Allowed CORS origins
    #[serde(default)]
    pub cors: CorsConfig,

    /// Route group toggles
    #[serde(default)]
    pub api: ApiConfig,

    /// The upstream main server
    #[serde(default)]
    pub main_server: MainServerConfig,

    /// Tool-use agent
    #[serde(default)]
    pub agent: AgentConfig,

    /// Embeddings and vector search
    #[serde(default)]
    pub vector: VectorConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Request body limit in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_server_host() -> String {
    "0.0.0.0".into()
}
fn default_server_port() -> u16 {
    8000
}
fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            body_limit: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// `"*"` allows any origin.
    #[serde(default = "default_origins")]
    pub origins: Vec<String>,
}

fn default_origins() -> Vec<String> {
    vec!["*".into()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_origins(),
        }
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.origins.is_empty() || self.origins.iter().any(|o| o.trim() == "*")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Names of route groups that should not be mounted.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl ApiConfig {
    pub fn is_enabled(&self, group: &str) -> bool {
        !self.disabled.iter().any(|d| d == group)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MainServerConfig {
    #[serde(default = "default_main_host")]
    pub host: String,

    #[serde(default = "default_main_port")]
    pub port: u16,

    /// Default request timeout for upstream calls.
    #[serde(default = "default_main_timeout")]
    pub timeout_secs: u64,

    /// Sent as `apiKey` in chat payloads and as a bearer token on `/api/v1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_main_host() -> String {
    "127.0.0.1".into()
}
fn default_main_port() -> u16 {
    1234
}
fn default_main_timeout() -> u64 {
    300
}

impl Default for MainServerConfig {
    fn default() -> Self {
        Self {
            host: default_main_host(),
            port: default_main_port(),
            timeout_secs: default_main_timeout(),
            api_key: None,
        }
    }
}

impl MainServerConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for MainServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// When false, chat requests are always proxied directly.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// How many tools are surfaced to the model (0 = all).
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,

    /// Log raw model output at info level.
    #[serde(default)]
    pub verbose: bool,

    /// Per model call timeout.
    #[serde(default = "default_agent_timeout")]
    pub request_timeout_secs: u64,

    /// How long a fetched tool listing stays fresh.
    #[serde(default = "default_tool_cache_ttl")]
    pub tool_cache_ttl_secs: u64,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Key the agent uses on the upstream `/api/v1` routes.
    #[serde(default = "default_agent_api_key")]
    pub api_key: Option<String>,
}

fn default_max_steps() -> u32 {
    6
}
fn default_max_tools() -> usize {
    40
}
fn default_agent_timeout() -> u64 {
    300
}
fn default_tool_cache_ttl() -> u64 {
    60
}
fn default_model() -> String {
    "gptgod".into()
}
fn default_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_agent_api_key() -> Option<String> {
    Some("xrk-agt".into())
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_steps: default_max_steps(),
            max_tools: default_max_tools(),
            verbose: false,
            request_timeout_secs: default_agent_timeout(),
            tool_cache_ttl_secs: default_tool_cache_ttl(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            api_key: default_agent_api_key(),
        }
    }
}

impl AgentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tool_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.tool_cache_ttl_secs)
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("enabled", &self.enabled)
            .field("max_steps", &self.max_steps)
            .field("max_tools", &self.max_tools)
            .field("verbose", &self.verbose)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("tool_cache_ttl_secs", &self.tool_cache_ttl_secs)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Embedding model name passed to the embeddings endpoint.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embeddings base URL; the main server's `/api/v1` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Probe attempts when loading the embedding model.
    #[serde(default = "default_load_retries")]
    pub load_retries: u32,

    /// Seconds to wait before retrying a failed model load.
    #[serde(default = "default_retry_cooldown")]
    pub retry_cooldown_secs: u64,

    /// Embedding cache capacity (entries).
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_embedding_model() -> String {
    "paraphrase-multilingual-MiniLM-L12-v2".into()
}
fn default_load_retries() -> u32 {
    3
}
fn default_retry_cooldown() -> u64 {
    60
}
fn default_cache_size() -> usize {
    1024
}
fn default_cache_ttl() -> u64 {
    3600
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            api_url: None,
            load_retries: default_load_retries(),
            retry_cooldown_secs: default_retry_cooldown(),
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `subserver_agent=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files; stdout only when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path, then apply environment
    /// overrides (`HOST`, `PORT`, `LOG_LEVEL`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&Self::config_path())
    }

    /// [`load`](Self::load) with an explicit file path.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path` unless a file already exists.
    ///
    /// Returns `true` when a file was written.
    pub fn init(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, Self::default_toml()).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), "Wrote default config");
        Ok(true)
    }

    /// Apply `HOST`, `PORT` and `LOG_LEVEL` from `lookup`.
    ///
    /// An unparsable `PORT` is ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(level) = lookup("LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
            self.logging.level = level.to_lowercase();
        }
    }

    /// The config file location: `$SUBSERVER_CONFIG`, else `~/.subserver/config.toml`.
    pub fn config_path() -> PathBuf {
        std::env::var("SUBSERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".subserver")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let temp = self.agent.default_temperature;
        if !(0.0..=2.0).contains(&temp) {
            return Err(ConfigError::ValidationError(
                "agent.default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.vector.cache_size == 0 {
            return Err(ConfigError::ValidationError(
                "vector.cache_size must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.main_server.url(), "http://127.0.0.1:1234");
        assert_eq!(config.agent.max_steps, 6);
        assert_eq!(config.agent.max_tools, 40);
        assert_eq!(config.agent.default_model, "gptgod");
        assert!(config.cors.allows_any());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.vector.model, config.vector.model);
        assert_eq!(parsed.agent.api_key, config.agent.api_key);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [main_server]
            port = 9999

            [api]
            disabled = ["vector-service"]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.main_server.port, 9999);
        assert_eq!(parsed.main_server.host, "127.0.0.1");
        assert_eq!(parsed.server.port, 8000);
        assert!(!parsed.api.is_enabled("vector-service"));
        assert!(parsed.api.is_enabled("langchain-service"));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.agent.default_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_steps_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_cache_size_rejected() {
        let mut config = AppConfig::default();
        config.vector.cache_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "server = [").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        assert!(AppConfig::init(&path).unwrap());
        assert!(!AppConfig::init(&path).unwrap());

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 8000);
        assert_eq!(loaded.vector.load_retries, 3);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> =
            HashMap::from([("HOST", "127.0.0.1"), ("PORT", "9001"), ("LOG_LEVEL", "DEBUG")]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn debug_redacts_api_keys() {
        let mut config = AppConfig::default();
        config.main_server.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("xrk-agt"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gptgod"));
        assert!(toml_str.contains("paraphrase-multilingual-MiniLM-L12-v2"));
    }
}
