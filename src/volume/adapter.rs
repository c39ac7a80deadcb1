use super::{
    api::{Scope, VolumeInfo},
    driver::VolumeBackend,
    error::PluginError,
    mountpoint::MountCheck,
    types::{DockerOptions, MountId, VolumeName, VolumeOptions},
};
use crate::backend::{ControlPlane, CreateVolumeRequest, VolumeOwner};
use crate::path::MountRoot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Active mount sessions per volume. Lives inside the adapter guard.
type Sessions = HashMap<VolumeName, HashSet<MountId>>;

/// Settings the adapter needs beyond the control-plane client.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub mount_root: MountRoot,
    pub default_owner: VolumeOwner,
    pub tenant: String,
    pub mount_check: MountCheck,
}

/// Maps protocol verbs onto the Maya control plane and the local mount root.
///
/// Every stateful verb runs under a single guard: one verb at a time across
/// all volumes, including the backend call and mount-point polling.
pub struct MayaDriver {
    client: Arc<dyn ControlPlane>,
    config: DriverConfig,
    sessions: Mutex<Sessions>,
}

impl MayaDriver {
    pub fn new(client: Arc<dyn ControlPlane>, config: DriverConfig) -> Self {
        Self {
            client,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn volume_info(&self, name: &str, path: &Path, meta: &Metadata) -> VolumeInfo {
        VolumeInfo {
            name: name.to_string(),
            mountpoint: path.to_string_lossy().to_string(),
            created_at: created_at(meta),
            status: None,
        }
    }
}

fn created_at(meta: &Metadata) -> Option<String> {
    meta.modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}

#[async_trait]
impl VolumeBackend for MayaDriver {
    async fn create(&self, name: VolumeName, opts: DockerOptions) -> Result<(), PluginError> {
        let owner = VolumeOptions::from(opts).owner(&self.config.default_owner);
        let _guard = self.sessions.lock().await;

        let request = CreateVolumeRequest {
            name: name.to_string(),
            owner,
        };
        match self.client.create_volume(&request).await {
            Ok(handle) => {
                info!(volume = %name, uuid = %handle.uuid, user = %request.owner.user, group = %request.owner.group, "volume created");
            }
            Err(e) if e.is_already_exists() => {
                info!(volume = %name, "volume already exists");
            }
            Err(e) => {
                warn!(volume = %name, error = %e, "volume creation failed");
                return Err(e.into());
            }
        }

        let mountpoint = self.config.mount_root.mountpoint(&name);
        info!(volume = %name, mountpoint = ?mountpoint, "validating mount point");
        self.config.mount_check.wait_ready(&mountpoint).await
    }

    async fn remove(&self, name: &VolumeName) -> Result<(), PluginError> {
        let mut sessions = self.sessions.lock().await;

        if let Some(ids) = sessions.get(name) {
            if !ids.is_empty() {
                return Err(PluginError::InUse(name.to_string(), ids.len()));
            }
        }

        self.client
            .delete_volume_by_name(name.as_str(), &self.config.tenant)
            .await
            .inspect_err(|e| warn!(volume = %name, error = %e, "volume removal failed"))?;

        sessions.remove(name);
        info!(volume = %name, "volume removed");
        Ok(())
    }

    async fn mount(&self, name: &VolumeName, id: &MountId) -> Result<PathBuf, PluginError> {
        let mut sessions = self.sessions.lock().await;
        let mountpoint = self.config.mount_root.mountpoint(name);

        let visible = tokio::fs::symlink_metadata(&mountpoint)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !visible {
            // Created on another host; the namespace may lag behind.
            debug!(volume = %name, "mount point not visible, waiting");
            self.config.mount_check.wait_ready(&mountpoint).await?;
        }

        let ids = sessions.entry(name.clone()).or_default();
        ids.insert(id.clone());
        info!(volume = %name, id = %id, mounts = ids.len(), mountpoint = ?mountpoint, "volume mounted");
        Ok(mountpoint)
    }

    async fn unmount(&self, name: &VolumeName, id: &MountId) -> Result<(), PluginError> {
        let mut sessions = self.sessions.lock().await;

        let remaining = match sessions.get_mut(name) {
            Some(ids) => {
                if !ids.remove(id) {
                    debug!(volume = %name, id = %id, "unknown mount id");
                }
                ids.len()
            }
            None => 0,
        };
        if remaining == 0 {
            sessions.remove(name);
        }

        info!(volume = %name, id = %id, mounts = remaining, "volume unmounted");
        Ok(())
    }

    fn path(&self, name: &VolumeName) -> PathBuf {
        self.config.mount_root.mountpoint(name)
    }

    async fn list(&self) -> Result<Vec<VolumeInfo>, PluginError> {
        let _guard = self.sessions.lock().await;

        let mut volumes = Vec::new();
        let mut entries = tokio::fs::read_dir(self.config.mount_root.as_path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    debug!(entry = ?entry.path(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !meta.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                debug!(entry = ?entry.path(), "skipping non UTF-8 entry");
                continue;
            };
            if VolumeName::new(name).is_err() {
                continue;
            }
            volumes.push(self.volume_info(name, &entry.path(), &meta));
        }

        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }

    async fn get(&self, name: &VolumeName) -> Result<VolumeInfo, PluginError> {
        let sessions = self.sessions.lock().await;
        let mountpoint = self.config.mount_root.mountpoint(name);

        let meta = match tokio::fs::symlink_metadata(&mountpoint).await {
            Ok(m) if m.is_dir() => m,
            Ok(_) => return Err(PluginError::NotMounted(mountpoint)),
            Err(e) => {
                debug!(volume = %name, error = %e, "mount point lookup failed");
                return Err(PluginError::NotMounted(mountpoint));
            }
        };

        let mounts = sessions.get(name).map(HashSet::len).unwrap_or(0);
        let mut info = self.volume_info(name.as_str(), &mountpoint, &meta);
        info.status = Some(HashMap::from([(
            "Mounts".to_string(),
            mounts.to_string(),
        )]));
        Ok(info)
    }

    fn scope(&self) -> Scope {
        Scope::Global
    }
}
