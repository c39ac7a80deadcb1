//! # mayavol
//!
//! `mayavol` is a Docker volume plugin for OpenEBS. It answers the Docker
//! volume plugin protocol on a Unix socket, asks the Maya control plane to
//! create and delete volumes, and reports the directories that appear under a
//! locally mounted OpenEBS namespace as volume mount points.
//!
//! The pieces:
//!
//! * [`volume`]: socket server, protocol handler and the driver adapter.
//! * [`backend`]: the [`backend::ControlPlane`] seam and its Maya JSON-RPC client.
//! * [`cmd`]: command line and layered configuration.
pub mod backend;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod path;
pub mod signal;
pub mod volume;
