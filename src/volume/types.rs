use super::error::PluginError;
use crate::backend::VolumeOwner;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use tracing::debug;

/// Raw `Opts` map as passed by `docker volume create -o key=value`.
pub type DockerOptions = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeName(String);

impl VolumeName {
    pub fn new<S: Into<String>>(name: S) -> Result<Self, PluginError> {
        let s = name.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), PluginError> {
        if s.is_empty() {
            return Err(PluginError::Validation(
                "Volume name cannot be empty".into(),
            ));
        }
        if s == "." || s == ".." {
            return Err(PluginError::Validation(format!(
                "Volume name cannot be '{}'",
                s
            )));
        }
        if s.contains('/') {
            return Err(PluginError::Validation(format!(
                "Volume name cannot contain slashes: '{}'",
                s
            )));
        }
        if s.contains('\0') {
            return Err(PluginError::Validation(
                "Volume name cannot contain null bytes".into(),
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for VolumeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for VolumeName {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for VolumeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque session identifier Docker attaches to a Mount/Unmount pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountId(String);

impl MountId {
    pub fn new<S: Into<String>>(id: S) -> Result<Self, PluginError> {
        let s = id.into();
        if s.is_empty() {
            return Err(PluginError::Validation("Mount ID cannot be empty".into()));
        }
        Ok(Self(s))
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-volume settings recognised in the create options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeOptions {
    pub user: Option<String>,
    pub group: Option<String>,
}

impl VolumeOptions {
    /// Owner for the backend volume, falling back to `defaults` for anything
    /// the caller did not set.
    pub fn owner(&self, defaults: &VolumeOwner) -> VolumeOwner {
        VolumeOwner {
            user: self.user.clone().unwrap_or_else(|| defaults.user.clone()),
            group: self.group.clone().unwrap_or_else(|| defaults.group.clone()),
        }
    }
}

impl From<DockerOptions> for VolumeOptions {
    fn from(map: DockerOptions) -> Self {
        let mut opts = VolumeOptions::default();
        for (k, v) in map {
            match k.as_str() {
                "user" => opts.user = Some(v),
                "group" => opts.group = Some(v),
                _ => debug!(option = %k, "ignoring unsupported volume option"),
            }
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_path_like_names() {
        assert!(VolumeName::new("").is_err());
        assert!(VolumeName::new("..").is_err());
        assert!(VolumeName::new("a/b").is_err());
        assert!(VolumeName::new("a\0b").is_err());
        assert!(VolumeName::new("pg-data_01").is_ok());
    }

    #[test]
    fn owner_defaults_to_configured_identity() {
        let defaults = VolumeOwner::default();
        let opts = VolumeOptions::from(DockerOptions::new());
        assert_eq!(opts.owner(&defaults), defaults);
        assert_eq!(defaults.user, "root");
        assert_eq!(defaults.group, "root");
    }

    #[test]
    fn owner_options_override_defaults() {
        let map = DockerOptions::from([
            ("user".to_string(), "postgres".to_string()),
            ("size".to_string(), "10G".to_string()),
        ]);
        let owner = VolumeOptions::from(map).owner(&VolumeOwner::default());
        assert_eq!(owner.user, "postgres");
        assert_eq!(owner.group, "root");
    }
}
