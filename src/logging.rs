//! Logging initialization for formwizard.
//!
//! Server mode: logs to `{paths.state}/logs/formwizard-{datetime}.log`
//! One-shot commands: logs to stderr

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Result of logging initialization
pub struct LoggingHandle {
    /// Flushes buffered log lines when dropped
    pub _guard: Option<WorkerGuard>,

    /// Path to the log file (only set when logging to a file)
    pub log_file_path: Option<PathBuf>,
}

/// Whether this run writes its log to a file
pub fn logs_to_file(config: &Config, server_mode: bool) -> bool {
    server_mode && config.logging.to_file
}

/// File name for a log started now
pub fn log_file_name() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    format!("formwizard-{}.log", timestamp)
}

fn level(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. The returned
/// handle must be kept alive for the duration of the program.
pub fn init_logging(
    config: &Config,
    server_mode: bool,
    debug_override: bool,
) -> Result<LoggingHandle> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| level(config, debug_override)),
    );

    if logs_to_file(config, server_mode) {
        let logs_dir = config.logs_path();
        std::fs::create_dir_all(&logs_dir)?;

        let log_filename = log_file_name();
        let log_file_path = logs_dir.join(&log_filename);
        let (non_blocking, guard) = file_writer(&logs_dir, &log_filename);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();

        Ok(LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(log_file_path),
        })
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        Ok(LoggingHandle {
            _guard: None,
            log_file_path: None,
        })
    }
}

fn file_writer(
    dir: &Path,
    file_name: &str,
) -> (tracing_appender::non_blocking::NonBlocking, WorkerGuard) {
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    tracing_appender::non_blocking(file_appender)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_logs_path_under_state() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let logs_dir = config.logs_path();
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_log_file_name_format() {
        let name = log_file_name();

        assert!(name.starts_with("formwizard-"));
        assert!(name.ends_with("Z.log"));
    }

    #[test]
    fn test_only_server_mode_logs_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);

        assert!(logs_to_file(&config, true));
        assert!(!logs_to_file(&config, false));

        config.logging.to_file = false;
        assert!(!logs_to_file(&config, true));
    }

    #[test]
    fn test_debug_flag_overrides_level() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.logging.level = "warn".to_string();

        assert_eq!(level(&config, false), "warn");
        assert_eq!(level(&config, true), "debug");
    }
}
