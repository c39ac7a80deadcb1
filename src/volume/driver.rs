use super::api::{Scope, VolumeInfo};
use super::error::PluginError;
use super::types::{DockerOptions, MountId, VolumeName};
use async_trait::async_trait;
use std::path::PathBuf;

/// Semantics behind each protocol verb. The HTTP service only shapes
/// requests and responses around these calls.
#[async_trait]
pub trait VolumeBackend: Send + Sync {
    async fn create(&self, name: VolumeName, opts: DockerOptions) -> Result<(), PluginError>;
    async fn remove(&self, name: &VolumeName) -> Result<(), PluginError>;
    async fn mount(&self, name: &VolumeName, id: &MountId) -> Result<PathBuf, PluginError>;
    async fn unmount(&self, name: &VolumeName, id: &MountId) -> Result<(), PluginError>;
    fn path(&self, name: &VolumeName) -> PathBuf;
    async fn list(&self) -> Result<Vec<VolumeInfo>, PluginError>;
    async fn get(&self, name: &VolumeName) -> Result<VolumeInfo, PluginError>;
    fn scope(&self) -> Scope;
}
