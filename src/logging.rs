//! Diagnostic logging. Everything goes to stderr; stdout carries the protocol.

use crate::env::{EnvTable, LOG_LEVEL};
use std::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Verbosity of the server's own diagnostics. Each level includes the ones
/// before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Silent,
    Error,
    Info,
    Debug,
}

impl LogLevel {
    /// Case-insensitive parse; anything unrecognised is `Info`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("silent") => Self::Silent,
            Some("error") => Self::Error,
            Some("debug") => Self::Debug,
            _ => Self::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Error => "error",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Silent => "off",
            Self::Error => "error",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
}

impl LogConfig {
    /// Read `MCP_ECHO_ENV_LOG_LEVEL` once; call after the `.env` file is applied.
    pub fn from_env(table: &dyn EnvTable) -> Self {
        Self {
            level: LogLevel::parse(table.get(LOG_LEVEL).as_deref()),
        }
    }

    pub fn filter(&self) -> EnvFilter {
        EnvFilter::new(self.level.directive())
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &LogConfig) {
    let _ = tracing_subscriber::registry()
        .with(config.filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .try_init();
}
