//! `subserver config`: Configuration management commands.

use std::path::Path;
use subserver_config::AppConfig;

const REDACTED: &str = "***";

/// The configuration as TOML with API keys masked.
fn redacted_toml(mut config: AppConfig) -> Result<String, toml::ser::Error> {
    if config.main_server.api_key.is_some() {
        config.main_server.api_key = Some(REDACTED.into());
    }
    if config.agent.api_key.is_some() {
        config.agent.api_key = Some(REDACTED.into());
    }
    toml::to_string_pretty(&config)
}

pub fn show(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_at(path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", path.display());
    println!("{}", redacted_toml(config)?);
    Ok(())
}

pub fn init(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if AppConfig::init(path)? {
        println!("Wrote default config to {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

pub fn path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", path.display());
    Ok(())
}
