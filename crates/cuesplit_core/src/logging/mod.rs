//! Logging infrastructure for cue-splitter.
//!
//! This module provides:
//! - Application-wide `tracing` setup (stderr, optionally a log file)
//! - Per-cuesheet run loggers with file + callback output
//! - Compact mode that keeps tool output in a tail buffer
//!
//! # Example
//!
//! ```no_run
//! use cuesplit_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("OK Computer", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Extracting tracks");
//! logger.command("ffmpeg -i CDImage.flac ...");
//! logger.progress(3, 12);
//! logger.success("12 tracks written");
//! ```

mod run_logger;
mod types;

use std::path::Path;

pub use run_logger::RunLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application log file name inside the logs folder.
pub const APP_LOG_FILE: &str = "cue-splitter.log";

/// Install the global subscriber: stderr only.
///
/// `RUST_LOG` wins over `default_level`. Later calls are no-ops.
pub fn init_tracing(default_level: LogLevel) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter(default_level))
        .try_init();
}

/// Install the global subscriber writing to stderr and to
/// `<logs_dir>/cue-splitter.log`.
///
/// Keep the returned guard alive until exit or buffered file lines are lost.
/// Falls back to stderr only (and `None`) when the folder cannot be created.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(logs_dir) {
        init_tracing(default_level);
        tracing::warn!("Cannot create logs folder {}: {}", logs_dir.display(), e);
        return None;
    }

    let appender = tracing_appender::rolling::never(logs_dir, APP_LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(env_filter(default_level))
        .try_init();

    Some(guard)
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_logging_returns_guard() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");

        let guard = init_tracing_with_file(LogLevel::Warn, &logs);

        assert!(guard.is_some());
        assert!(logs.is_dir());
    }
}
