//! Path normalization for the plugin's host-side directories.
//!
//! [`AbsolutePath`] is used for every configured location (socket, mount root)
//! so that relative inputs and `..` components are resolved once at startup.
//! [`MountRoot`] derives per-volume mount points from it.

use crate::volume::types::VolumeName;
use serde::{Deserialize, Deserializer};
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// A path that is guaranteed to be absolute and lexically normalized.
///
/// This type does not verify existence on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsolutePath(PathBuf);

impl AbsolutePath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(path.as_ref().absolute())
    }
    pub fn as_path(&self) -> &Path {
        &self.0
    }
    pub fn parent(&self) -> Option<AbsolutePath> {
        self.0.parent().map(AbsolutePath::new)
    }
}

/// The directory under which every volume's mount point is an immediate child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRoot(AbsolutePath);

impl MountRoot {
    pub fn new(path: impl Into<AbsolutePath>) -> Self {
        Self(path.into())
    }

    /// `root/name`. Never touches the filesystem.
    pub fn mountpoint(&self, name: &VolumeName) -> PathBuf {
        self.0.as_path().join(name.as_str())
    }

    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Deref for MountRoot {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.0.as_path()
    }
}

impl std::fmt::Display for MountRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

trait PathExt {
    /// Resolves `.` and `..` lexically. Does not touch the filesystem.
    fn clean(&self) -> PathBuf;
    /// Anchors the path to the current working directory, then cleans it.
    fn absolute(&self) -> PathBuf;
}

impl PathExt for Path {
    fn clean(&self) -> PathBuf {
        let mut ret = PathBuf::new();
        for component in self.components() {
            match component {
                Component::Prefix(p) => ret.push(p.as_os_str()),
                Component::RootDir => ret.push(component.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    ret.pop();
                }
                Component::Normal(c) => ret.push(c),
            }
        }
        ret
    }

    fn absolute(&self) -> PathBuf {
        let anchored = std::path::absolute(self).unwrap_or_else(|_| self.to_path_buf());
        anchored.clean()
    }
}

impl From<PathBuf> for AbsolutePath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for AbsolutePath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<&str> for AbsolutePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Deref for AbsolutePath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.display().fmt(f)
    }
}

impl FromStr for AbsolutePath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("path cannot be empty".to_string());
        }
        Ok(AbsolutePath::new(s))
    }
}

impl<'de> Deserialize<'de> for AbsolutePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_clean() {
        assert_eq!(Path::new("a/./b/./c").clean(), PathBuf::from("a/b/c"));
        assert_eq!(Path::new("/a/b/../c").clean(), PathBuf::from("/a/c"));
        assert_eq!(Path::new("/../a").clean(), PathBuf::from("/a"));
        assert_eq!(Path::new("/run/docker/").clean(), PathBuf::from("/run/docker"));
    }

    #[test]
    fn test_absolute_path_cleaning() {
        let p = AbsolutePath::new("mnt/../openebs");
        let s = p.to_string();
        assert!(p.is_absolute());
        assert!(!s.contains(".."));
        assert!(s.ends_with("openebs"));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(AbsolutePath::from_str("  ").is_err());
    }

    #[test]
    fn test_mountpoint_is_child_of_root() {
        let root = MountRoot::new(AbsolutePath::new("/run/docker/openebs/mnt"));
        let name = VolumeName::new("data").unwrap();
        assert_eq!(
            root.mountpoint(&name),
            PathBuf::from("/run/docker/openebs/mnt/data")
        );
    }
}
