use crate::config::Overlay;
use clap::{Args, ValueEnum};
use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, filter::ParseError, fmt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("failed to install logger: {0}")]
    Init(#[from] TryInitError),
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl Logger {
    /// Installs the global subscriber. `RUST_LOG` overrides the configured level.
    pub fn init(&self) -> Result<(), LoggingError> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.level.as_str())?,
        };

        match self.format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_current_span(false))
                .try_init()?,
            LogFormat::Text => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false))
                .try_init()?,
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggerArgs {
    /// Log output format
    #[arg(long, env = "MAYAVOL_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log verbosity
    #[arg(long, env = "MAYAVOL_LOG_LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,
}

impl Overlay for LoggerArgs {
    fn overlay(self, over: Self) -> Self {
        Self {
            log_format: self.log_format.overlay(over.log_format),
            log_level: self.log_level.overlay(over.log_level),
        }
    }
}

impl From<LoggerArgs> for Logger {
    fn from(args: LoggerArgs) -> Self {
        Self {
            format: args.log_format.unwrap_or_default(),
            level: args.log_level.unwrap_or_default(),
        }
    }
}
