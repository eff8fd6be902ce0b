use std::str::FromStr;

use tracing::{Level, Metadata};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, filter_fn};
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;
use crate::utils::error::{AppError, Result};

/// Start, stop, authentication and other process milestones.
pub const LIFECYCLE: &str = "alliance_monitor::lifecycle";
/// Detected title changes and what was done about them.
pub const CHANGE: &str = "alliance_monitor::change";
/// The throttled "still watching" status line.
pub const HEARTBEAT: &str = "alliance_monitor::heartbeat";

const CRATE_TARGET: &str = "alliance_monitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Lifecycle,
    Change,
    Heartbeat,
    /// Per-poll chatter; console only.
    Routine,
}

impl LogCategory {
    pub fn from_target(target: &str) -> Self {
        match target {
            LIFECYCLE => LogCategory::Lifecycle,
            CHANGE => LogCategory::Change,
            HEARTBEAT => LogCategory::Heartbeat,
            _ => LogCategory::Routine,
        }
    }

    pub fn is_persisted(self) -> bool {
        !matches!(self, LogCategory::Routine)
    }
}

/// Decides which records reach the log file.
///
/// A record is persisted when it belongs to this crate and either carries a
/// non-routine category or is at least as severe as `min_level`.
#[derive(Debug, Clone, Copy)]
pub struct FileRouting {
    pub min_level: Level,
}

impl FileRouting {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }

    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let level = Level::from_str(&config.file_level).map_err(|_| AppError::Parse {
            message: format!("invalid log level '{}'", config.file_level),
        })?;
        Ok(Self::new(level))
    }

    pub fn persists(&self, level: &Level, target: &str) -> bool {
        if !target.starts_with(CRATE_TARGET) {
            return false;
        }
        LogCategory::from_target(target).is_persisted() || *level <= self.min_level
    }

    fn accepts(&self, metadata: &Metadata<'_>) -> bool {
        self.persists(metadata.level(), metadata.target())
    }
}

/// Install the console and file layers. The returned guard flushes the file
/// writer on drop and must be held for the life of the process.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.directory)?;
    let routing = FileRouting::from_config(config)?;

    let file_appender = tracing_appender::rolling::never(&config.directory, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.console_filter));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(false)
        .with_ansi(false)
        .with_filter(filter_fn(move |metadata| routing.accepts(metadata)));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("failed to install log subscriber: {}", e)))?;

    Ok(guard)
}
