//! subserver CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP server
//! - `ask`: Run the agent once and print the answer
//! - `tools`: List the main server's MCP tools
//! - `config`: Show, initialize or locate the config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use subserver_config::AppConfig;

mod commands;
mod logging;

#[derive(Parser)]
#[command(
    name = "subserver",
    about = "subserver: tool-use agent, chat proxy and vector search",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.subserver/config.toml)
    #[arg(short, long, global = true, env = "SUBSERVER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the agent a single question
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        /// Answer without calling any tools
        #[arg(long)]
        no_tools: bool,

        /// Model or provider identifier
        #[arg(long)]
        model: Option<String>,
    },

    /// List the tools the main server exposes
    Tools,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration if none exists
    Init,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(AppConfig::config_path);

    // Config commands must work even when the file is missing or invalid.
    let command = match cli.command {
        Commands::Config { action } => {
            logging::init(&Default::default(), cli.verbose);
            return match action {
                ConfigAction::Show => commands::config_cmd::show(&path),
                ConfigAction::Init => commands::config_cmd::init(&path),
                ConfigAction::Path => commands::config_cmd::path(&path),
            };
        }
        other => other,
    };

    let config = AppConfig::load_at(&path).map_err(|e| format!("Failed to load config: {e}"))?;
    // Keeps the file writer flushing until exit.
    let _log_guard = logging::init(&config.logging, cli.verbose);
    tracing::debug!(path = %path.display(), "Configuration loaded");

    match command {
        Commands::Serve { host, port } => commands::serve::run(config, host, port).await?,
        Commands::Ask {
            message,
            no_tools,
            model,
        } => commands::ask::run(config, message, !no_tools, model, cli.verbose).await?,
        Commands::Tools => commands::tools::run(config).await?,
        // Handled above.
        Commands::Config { .. } => {}
    }

    Ok(())
}
