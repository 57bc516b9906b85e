//! Tracing setup. The TUI owns the terminal, so logs go to a daily file.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter, e.g. `crmdesk=debug`
pub const LOG_ENV: &str = "CRMDESK_LOG";
const DEFAULT_FILTER: &str = "info";

/// Directory holding log files
pub fn log_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|p| p.join("crmdesk").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory"))
}

/// Filter from `CRMDESK_LOG`, falling back to `info` when unset or invalid
fn env_filter() -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init() -> Result<WorkerGuard> {
  let dir = log_dir()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "crmdesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(env_filter())
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}
