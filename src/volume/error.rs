use crate::backend::BackendError;
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("timed out waiting for mount point {} after {attempts} checks in {}ms", .path.display(), .waited.as_millis())]
    NotReady {
        path: PathBuf,
        attempts: u32,
        waited: Duration,
    },

    #[error("{} not mounted", .0.display())]
    NotMounted(PathBuf),

    #[error("volume {0} is in use by {1} mount(s)")]
    InUse(String, usize),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct DockerErrorResponse {
    #[serde(rename = "Err")]
    err: String,
}

impl PluginError {
    /// Docker expects failures as a 200 with a non-empty `Err` field.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let err_msg = self.to_string();

        tracing::error!(error = %err_msg, "plugin request failed");

        let body = DockerErrorResponse { err: err_msg };
        let json = serde_json::to_vec(&body)
            .unwrap_or_else(|_| b"{\"Err\":\"Internal Serialization Error\"}".to_vec());

        let mut resp = Response::new(Full::new(Bytes::from(json)));
        *resp.status_mut() = StatusCode::OK;
        resp.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static(super::api::PLUGIN_CONTENT_TYPE),
        );
        resp
    }
}
