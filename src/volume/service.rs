use crate::volume::api::*;
use crate::volume::driver::VolumeBackend;
use crate::volume::error::PluginError;
use crate::volume::types::{MountId, VolumeName};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PluginRoute {
    Activate,
    Capabilities,
    Create,
    Get,
    List,
    Mount,
    Path,
    Remove,
    Unmount,
}

impl PluginRoute {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/Plugin.Activate" => Some(Self::Activate),
            "/VolumeDriver.Capabilities" => Some(Self::Capabilities),
            "/VolumeDriver.Create" => Some(Self::Create),
            "/VolumeDriver.Get" => Some(Self::Get),
            "/VolumeDriver.List" => Some(Self::List),
            "/VolumeDriver.Mount" => Some(Self::Mount),
            "/VolumeDriver.Path" => Some(Self::Path),
            "/VolumeDriver.Remove" => Some(Self::Remove),
            "/VolumeDriver.Unmount" => Some(Self::Unmount),
            _ => None,
        }
    }
}

/// hyper service translating Docker plugin HTTP calls into [`VolumeBackend`] calls.
#[derive(Clone)]
pub struct DockerPluginService {
    driver: Arc<dyn VolumeBackend>,
}

impl DockerPluginService {
    pub fn new(driver: Arc<dyn VolumeBackend>) -> Self {
        Self { driver }
    }

    /// Routes a request by path. Failures are rendered into the `Err` field.
    pub async fn dispatch(&self, path: &str, body: Bytes) -> Response<Full<Bytes>> {
        let Some(route) = PluginRoute::from_path(path) else {
            debug!(path, "unknown plugin route");
            let mut not_found = Response::new(Full::default());
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            return not_found;
        };

        match self.handle(route, body).await {
            Ok(resp) => resp,
            Err(e) => e.into_response(),
        }
    }

    async fn handle(
        &self,
        route: PluginRoute,
        body: Bytes,
    ) -> Result<Response<Full<Bytes>>, PluginError> {
        match route {
            PluginRoute::Activate => self.handle_activate(),
            PluginRoute::Capabilities => self.handle_capabilities(),
            PluginRoute::Create => self.handle_create(body).await,
            PluginRoute::Get => self.handle_get(body).await,
            PluginRoute::List => self.handle_list().await,
            PluginRoute::Mount => self.handle_mount(body).await,
            PluginRoute::Path => self.handle_path(body),
            PluginRoute::Remove => self.handle_remove(body).await,
            PluginRoute::Unmount => self.handle_unmount(body).await,
        }
    }

    fn handle_activate(&self) -> Result<Response<Full<Bytes>>, PluginError> {
        json_ok(&PluginActivateResponse {
            implements: vec!["VolumeDriver".to_string()],
        })
    }

    fn handle_capabilities(&self) -> Result<Response<Full<Bytes>>, PluginError> {
        json_ok(&CapabilitiesResponse {
            capabilities: Capabilities {
                scope: self.driver.scope(),
            },
        })
    }

    async fn handle_create(&self, body: Bytes) -> Result<Response<Full<Bytes>>, PluginError> {
        let req: CreateRequest = decode(&body)?;
        let name = VolumeName::new(req.name)?;

        debug!(volume = %name, "create requested");
        self.driver
            .create(name, req.opts.unwrap_or_default())
            .await?;
        json_ok(&SuccessResponse {})
    }

    async fn handle_remove(&self, body: Bytes) -> Result<Response<Full<Bytes>>, PluginError> {
        let req: NameRequest = decode(&body)?;
        let name = VolumeName::new(req.name)?;

        debug!(volume = %name, "remove requested");
        self.driver.remove(&name).await?;
        json_ok(&SuccessResponse {})
    }

    async fn handle_mount(&self, body: Bytes) -> Result<Response<Full<Bytes>>, PluginError> {
        let req: MountRequest = decode(&body)?;
        let name = VolumeName::new(req.name)?;
        let id = MountId::new(req.id)?;

        debug!(volume = %name, id = %id, "mount requested");
        let path = self.driver.mount(&name, &id).await?;

        json_ok(&MountResponse {
            mountpoint: path.to_string_lossy().to_string(),
        })
    }

    async fn handle_unmount(&self, body: Bytes) -> Result<Response<Full<Bytes>>, PluginError> {
        let req: MountRequest = decode(&body)?;
        let name = VolumeName::new(req.name)?;
        let id = MountId::new(req.id)?;

        debug!(volume = %name, id = %id, "unmount requested");
        self.driver.unmount(&name, &id).await?;
        json_ok(&SuccessResponse {})
    }

    fn handle_path(&self, body: Bytes) -> Result<Response<Full<Bytes>>, PluginError> {
        let req: NameRequest = decode(&body)?;
        let name = VolumeName::new(req.name)?;

        json_ok(&MountResponse {
            mountpoint: self.driver.path(&name).to_string_lossy().to_string(),
        })
    }

    async fn handle_list(&self) -> Result<Response<Full<Bytes>>, PluginError> {
        let volumes = self.driver.list().await?;
        json_ok(&ListResponse { volumes })
    }

    async fn handle_get(&self, body: Bytes) -> Result<Response<Full<Bytes>>, PluginError> {
        let req: NameRequest = decode(&body)?;
        let name = VolumeName::new(req.name)?;

        let volume = self.driver.get(&name).await?;
        json_ok(&GetResponse { volume })
    }
}

impl Service<Request<Incoming>> for DockerPluginService {
    type Response = Response<Full<Bytes>>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let svc = self.clone();
        Box::pin(async move {
            let path = req.uri().path().to_string();
            info!(method = ?req.method(), path = %path, "Received request");

            let body = match req.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => return Ok(PluginError::Internal(e.to_string()).into_response()),
            };
            Ok(svc.dispatch(&path, body).await)
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, PluginError> {
    serde_json::from_slice(body).map_err(PluginError::Json)
}

fn json_ok<T: Serialize>(data: &T) -> Result<Response<Full<Bytes>>, PluginError> {
    let json = serde_json::to_vec(data)?;
    let mut resp = Response::new(Full::new(Bytes::from(json)));
    resp.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static(PLUGIN_CONTENT_TYPE),
    );
    Ok(resp)
}
