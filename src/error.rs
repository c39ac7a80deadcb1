use crate::{
    backend::BackendError, config::ConfigError, logging::LoggingError, volume::error::PluginError,
};
use sysexits::ExitCode;
use thiserror::Error;

/// Errors that end the plugin process.
///
/// Per-request failures never get here; they are rendered into the protocol
/// response by [`PluginError::into_response`].
#[derive(Debug, Error)]
pub enum MayavolError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MayavolError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            MayavolError::Backend(e) => match e {
                BackendError::Network(_) => ExitCode::Unavailable,
                BackendError::Unauthorized(_) => ExitCode::NoPerm,
                BackendError::InvalidConfig(_) => ExitCode::Config,
                _ => ExitCode::Software,
            },
            MayavolError::Plugin(PluginError::Io(_)) => ExitCode::IoErr,
            MayavolError::Plugin(_) => ExitCode::Software,
            MayavolError::Logging(_) => ExitCode::Config,
            MayavolError::ConfigFile(e) => match e {
                ConfigError::Io(_) => ExitCode::NoInput,
                ConfigError::Parse(_) => ExitCode::Config,
            },
            MayavolError::Config(_) => ExitCode::Config,
            MayavolError::Io(_) => ExitCode::IoErr,
        }
    }
}
