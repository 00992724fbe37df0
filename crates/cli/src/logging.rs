//! Tracing subscriber setup.

use std::path::Path;
use subserver_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// The filter directive: `--verbose` wins, then `RUST_LOG`, then `logging.level`.
fn filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber: stderr (text or JSON) plus an optional
/// daily-rolling file. The returned guard must live until exit.
///
/// A log file that cannot be opened is reported and skipped; stderr logging
/// still starts.
pub fn init(config: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let (json_layer, text_layer) = if config.json {
        (
            Some(fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    };

    let appender = config.file.as_deref().and_then(|path| match rolling_appender(path) {
        Ok(appender) => Some(appender),
        Err(e) => {
            // No subscriber yet, so this goes straight to stderr.
            eprintln!("warning: cannot open log file {}: {e}", path.display());
            None
        }
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter(config, verbose))
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .ok();

    guard
}

/// `logs/subserver.log` rolls to `logs/subserver.log.YYYY-MM-DD`.
fn rolling_appender(path: &Path) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subserver.log".into());
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .build(dir)?;
    Ok(appender)
}
