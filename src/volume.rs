//! Docker volume plugin server.
//!
//! Binds the plugin socket, wires the [`MayaDriver`] adapter behind the
//! [`DockerPluginService`] protocol handler and serves connections until a
//! shutdown signal arrives.
use crate::backend::{ControlPlane, MayaClient};
use crate::cmd::PluginConfig;
use crate::error::MayavolError;
use crate::path::AbsolutePath;
use crate::signal::ShutdownSignal;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use nix::unistd::{Group, chown};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing::{error, info, warn};

pub mod adapter;
pub mod api;
pub mod driver;
pub mod error;
pub mod mountpoint;
pub mod service;
pub mod types;

use adapter::{DriverConfig, MayaDriver};
use service::DockerPluginService;

pub struct VolumePlugin {
    config: PluginConfig,
}

impl VolumePlugin {
    pub fn new(config: PluginConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<(), MayavolError> {
        let client: Arc<dyn ControlPlane> = Arc::new(MayaClient::new(self.config.api.clone())?);
        self.serve(client).await
    }

    /// Serves the plugin protocol using the given control plane client.
    pub async fn serve(&self, client: Arc<dyn ControlPlane>) -> Result<(), MayavolError> {
        self.prepare_mount_root().await;

        let socket_path = &self.config.socket;
        self.ensure_socket_path(socket_path).await?;
        let listener = UnixListener::bind(socket_path)?;
        self.restrict_socket(socket_path)?;

        let driver = Arc::new(MayaDriver::new(
            client,
            DriverConfig {
                mount_root: self.config.mount_root.clone(),
                default_owner: self.config.default_owner.clone(),
                tenant: self.config.tenant.clone(),
                mount_check: self.config.mount_check,
            },
        ));
        let service = DockerPluginService::new(driver);

        info!(socket = %socket_path, mount_root = %self.config.mount_root, "Docker Plugin listening");

        let mut shutdown = ShutdownSignal::install()?;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let io = TokioIo::new(stream);
                            let svc = service.clone();

                            tokio::task::spawn(async move {
                                if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                                    error!("Error serving connection: {:?}", err);
                                }
                            });
                        }
                        Err(e) => error!("Socket accept error: {}", e),
                    }
                }

                _ = shutdown.recv() => {
                    info!("Shutting down plugin");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Creates the mount root if needed. Failures are logged, not fatal: the
    /// namespace may be mounted there later.
    async fn prepare_mount_root(&self) {
        let root = self.config.mount_root.as_path();

        if !tokio::fs::try_exists(root).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::create_dir_all(root).await {
                warn!(mount_root = ?root, error = %e, "failed to create mount root");
                return;
            }
            if let Err(e) =
                tokio::fs::set_permissions(root, std::fs::Permissions::from_mode(0o555)).await
            {
                warn!(mount_root = ?root, error = %e, "failed to set mount root permissions");
            }
        }

        let parent = root.parent().unwrap_or(root);
        match (tokio::fs::metadata(root).await, tokio::fs::metadata(parent).await) {
            (Ok(r), Ok(p)) if r.dev() == p.dev() && root != parent => {
                warn!(mount_root = ?root, "mount root is not a mount point; volumes appear once the OpenEBS namespace is mounted there");
            }
            _ => {}
        }
    }

    async fn ensure_socket_path(&self, path: &AbsolutePath) -> Result<(), MayavolError> {
        if path.exists() {
            info!("Removing existing socket file: {:?}", path);
            tokio::fs::remove_file(path).await?;
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Hands the socket to the configured group so the Docker daemon can connect.
    fn restrict_socket(&self, path: &AbsolutePath) -> Result<(), MayavolError> {
        let name = &self.config.group;
        let group = Group::from_name(name)
            .map_err(|e| MayavolError::Config(format!("group lookup '{}': {}", name, e)))?
            .ok_or_else(|| MayavolError::Config(format!("unknown group '{}'", name)))?;

        chown(path.as_path(), None, Some(group.gid)).map_err(std::io::Error::from)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o660))?;
        Ok(())
    }
}

impl Drop for VolumePlugin {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.config.socket);
    }
}
