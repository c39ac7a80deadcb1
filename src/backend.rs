//! Storage control-plane abstractions.
//!
//! The adapter only needs two calls from the control plane: create a volume
//! with an owner, and delete a volume by name. [`ControlPlane`] captures that
//! contract so the adapter can be exercised against any implementation; the
//! OpenEBS Maya JSON-RPC client in [`maya`] is the one used in production.

use async_trait::async_trait;
use serde::Deserialize;

pub mod maya;

pub use maya::{ApiEndpoints, MayaClient, MayaConfig};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The volume (or another entity with that name) already exists
    #[error("entity already exists: {0}")]
    AlreadyExists(String),

    /// The referenced volume is unknown to the control plane
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Authentication/Authorization failures
    #[error("access denied: {0}")]
    Unauthorized(String),

    /// Transport level failure talking to the API
    #[error("network request failed: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Any other error reported by the API
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Invalid or missing configuration
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::AlreadyExists(_))
    }
}

/// User and group that own the root directory of a new volume.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumeOwner {
    pub user: String,
    pub group: String,
}

impl Default for VolumeOwner {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            group: "root".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateVolumeRequest {
    pub name: String,
    pub owner: VolumeOwner,
}

/// What the control plane hands back for a created volume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeHandle {
    pub uuid: String,
}

/// Client for the remote storage control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create a volume. Must report an existing volume as
    /// [`BackendError::AlreadyExists`] rather than a generic failure.
    async fn create_volume(
        &self,
        request: &CreateVolumeRequest,
    ) -> Result<VolumeHandle, BackendError>;

    /// Delete the volume registered under `name` within `tenant`.
    async fn delete_volume_by_name(&self, name: &str, tenant: &str) -> Result<(), BackendError>;
}
