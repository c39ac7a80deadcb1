//! Layered configuration: built-in defaults, then an optional TOML file, then
//! command line arguments and environment variables.
use crate::error::MayavolError;
use crate::path::AbsolutePath;
use clap::Args;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Trait for merging two partial structs.
pub trait Overlay {
    /// self is the base layer, over is the top layer.
    fn overlay(self, over: Self) -> Self;
}

// If top layer exists, use it. Otherwise keep base.
impl<T> Overlay for Option<T> {
    fn overlay(self, over: Self) -> Self {
        over.or(self)
    }
}

#[derive(Args, Debug, Clone)]
pub struct LayeredArgs<T: Args> {
    /// Path to a TOML configuration file
    #[arg(long, env = "MAYAVOL_CONFIG")]
    pub config: Option<AbsolutePath>,

    #[command(flatten)]
    pub inner: T,
}

impl<T> LayeredArgs<T>
where
    T: Args,
{
    pub fn load<C>(self) -> Result<C, MayavolError>
    where
        T: Layered<C>,
    {
        self.inner.resolve(self.config.as_deref())
    }
}

pub trait Layered<C>: Overlay + DeserializeOwned + Default + Sized {
    fn resolve(self, config_path: Option<&Path>) -> Result<C, MayavolError>;
}

impl<T, C> Layered<C> for T
where
    T: Overlay + DeserializeOwned + Default,
    T: TryInto<C>,
    <T as TryInto<C>>::Error: Into<MayavolError>,
{
    fn resolve(self, config_path: Option<&Path>) -> Result<C, MayavolError> {
        let base = match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
                toml::from_str::<Self>(&content).map_err(ConfigError::Parse)?
            }
            None => Self::default(),
        };

        base.overlay(self).try_into().map_err(Into::into)
    }
}

pub(crate) fn de_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<String> = Option::deserialize(deserializer)?;
    Ok(v.map(|s| SecretString::new(s.into())))
}

/// Accepts humantime strings such as `"500ms"` or `"30s"`.
pub(crate) fn de_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<String> = Option::deserialize(deserializer)?;
    v.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub(crate) fn parse_secret(s: &str) -> Result<SecretString, String> {
    if s.is_empty() {
        return Err("value cannot be empty".to_string());
    }
    Ok(SecretString::new(s.into()))
}
