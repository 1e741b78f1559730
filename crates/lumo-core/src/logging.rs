//! File-backed `tracing` setup.
//!
//! The terminal belongs to the UI, so log output goes to a daily-rolling
//! file under `${LUMO_HOME}/logs`. Filter precedence: `LUMO_LOG` env var,
//! then `log_filter` from config, then `warn`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

pub const LOG_ENV_VAR: &str = "LUMO_LOG";
const DEFAULT_FILTER: &str = "warn";
const LOG_FILE_PREFIX: &str = "lumo.log";

/// Builds the filter from env, config, and the default level.
pub fn build_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        let directive = config.log_filter.as_deref().unwrap_or(DEFAULT_FILTER);
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    })
}

/// Installs the global subscriber writing to `logs_dir`.
///
/// The returned guard must be held for the lifetime of the process so
/// buffered lines are flushed on exit. A second call leaves the first
/// subscriber in place.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init(config: &Config, logs_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .compact();

    let _ = subscriber.try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_init_creates_log_dir() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");

        let _guard = init(&Config::default(), &logs).unwrap();

        assert!(logs.is_dir());
    }

    #[test]
    fn test_invalid_config_filter_falls_back() {
        let config = Config {
            log_filter: Some("lumo_core=[".to_string()),
            ..Config::default()
        };
        // Must not panic on a bad directive.
        let _ = build_filter(&config);
    }
}
