use super::{BackendError, ControlPlane, CreateVolumeRequest, VolumeHandle};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// One or more API servers, tried in order until one answers.
///
/// Parsed from `http(s)://host[:port][,host[:port]...]`. Entries after the
/// first may omit the scheme, in which case the previous entry's is reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints(Vec<Url>);

impl ApiEndpoints {
    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.0.iter()
    }
}

impl FromStr for ApiEndpoints {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scheme: Option<String> = None;
        let mut urls = Vec::new();

        for raw in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let candidate = if raw.contains("://") {
                raw.to_string()
            } else {
                match &scheme {
                    Some(sch) => format!("{}://{}", sch, raw),
                    None => {
                        return Err(format!(
                            "API URL '{}' must start with http:// or https://",
                            raw
                        ));
                    }
                }
            };

            let url =
                Url::parse(&candidate).map_err(|e| format!("invalid API URL '{}': {}", raw, e))?;
            match url.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(format!(
                        "unsupported scheme '{}' in API URL '{}'",
                        other, raw
                    ));
                }
            }
            if url.host_str().is_none() {
                return Err(format!("API URL '{}' has no host", raw));
            }

            scheme = Some(url.scheme().to_string());
            urls.push(url);
        }

        if urls.is_empty() {
            return Err("API URL cannot be empty".to_string());
        }
        Ok(Self(urls))
    }
}

impl fmt::Display for ApiEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(Url::as_str).collect();
        write!(f, "{}", joined.join(","))
    }
}

impl<'de> Deserialize<'de> for ApiEndpoints {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone)]
pub struct MayaConfig {
    pub endpoints: ApiEndpoints,
    pub user: String,
    pub password: SecretString,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: &'a P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Serialize)]
struct CreateVolumeParams<'a> {
    name: &'a str,
    root_user_id: &'a str,
    root_group_id: &'a str,
}

#[derive(Serialize)]
struct ResolveVolumeNameParams<'a> {
    volume_name: &'a str,
    tenant_domain: &'a str,
}

#[derive(Serialize)]
struct DeleteVolumeParams<'a> {
    volume_uuid: &'a str,
}

#[derive(Deserialize)]
struct VolumeUuidResult {
    volume_uuid: String,
}

/// JSON-RPC client for the OpenEBS Maya API server.
pub struct MayaClient {
    client: Client,
    endpoints: ApiEndpoints,
    user: String,
    password: SecretString,
    next_id: AtomicU64,
}

impl MayaClient {
    pub fn new(cfg: MayaConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| BackendError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            endpoints: cfg.endpoints,
            user: cfg.user,
            password: cfg.password,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issues `method` against each endpoint in turn, moving on only when an
    /// endpoint cannot be reached.
    async fn call<P, R>(&self, method: &str, params: &P) -> Result<Option<R>, BackendError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed).to_string(),
            method,
            params,
        };

        let mut last_err = None;
        for endpoint in self.endpoints.iter() {
            match self.call_endpoint(endpoint, &request).await {
                Err(BackendError::Network(e)) => {
                    warn!(endpoint = %endpoint, error = %e, "API server unreachable");
                    last_err = Some(BackendError::Network(e));
                }
                other => return other,
            }
        }

        Err(last_err
            .unwrap_or_else(|| BackendError::InvalidConfig("no API endpoints configured".into())))
    }

    async fn call_endpoint<P, R>(
        &self,
        endpoint: &Url,
        request: &RpcRequest<'_, P>,
    ) -> Result<Option<R>, BackendError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(endpoint = %endpoint, method = request.method, id = %request.id, "rpc call");

        let resp = self
            .client
            .post(endpoint.clone())
            .basic_auth(&self.user, Some(self.password.expose_secret()))
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.into()))?;

        let status = resp.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(BackendError::Unauthorized(status.to_string()));
            }
            s if !s.is_success() => {
                return Err(BackendError::Other(format!("API server returned {}", s)));
            }
            _ => {}
        }

        let envelope: RpcResponse<R> = resp
            .json()
            .await
            .map_err(|e| BackendError::Other(format!("malformed rpc response: {}", e)))?;

        match envelope.error {
            Some(err) => Err(classify(err)),
            None => Ok(envelope.result),
        }
    }
}

/// Maps an RPC error onto the categories the adapter reasons about.
fn classify(err: RpcError) -> BackendError {
    if err.message.contains("ENTITY_EXISTS_ALREADY") {
        BackendError::AlreadyExists(err.message)
    } else if err.message.contains("ENTITY_NOT_FOUND") {
        BackendError::NotFound(err.message)
    } else {
        BackendError::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

#[async_trait]
impl ControlPlane for MayaClient {
    async fn create_volume(
        &self,
        request: &CreateVolumeRequest,
    ) -> Result<VolumeHandle, BackendError> {
        let params = CreateVolumeParams {
            name: &request.name,
            root_user_id: &request.owner.user,
            root_group_id: &request.owner.group,
        };

        let result: VolumeUuidResult = self
            .call("createVolume", &params)
            .await?
            .ok_or_else(|| BackendError::Other("createVolume returned no result".into()))?;

        Ok(VolumeHandle {
            uuid: result.volume_uuid,
        })
    }

    async fn delete_volume_by_name(&self, name: &str, tenant: &str) -> Result<(), BackendError> {
        let params = ResolveVolumeNameParams {
            volume_name: name,
            tenant_domain: tenant,
        };
        let resolved: VolumeUuidResult = self
            .call("resolveVolumeName", &params)
            .await?
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;

        let params = DeleteVolumeParams {
            volume_uuid: &resolved.volume_uuid,
        };
        self.call::<_, serde_json::Value>("deleteVolume", &params)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoint_list_with_inherited_scheme() {
        let eps: ApiEndpoints = "https://maya-0:7860, maya-1:7860".parse().unwrap();
        let urls: Vec<&str> = eps.iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://maya-0:7860/", "https://maya-1:7860/"]);
    }

    #[test]
    fn rejects_bad_endpoints() {
        assert!("".parse::<ApiEndpoints>().is_err());
        assert!("localhost:7860".parse::<ApiEndpoints>().is_err());
        assert!("ftp://maya:21".parse::<ApiEndpoints>().is_err());
    }

    #[test]
    fn classifies_rpc_errors() {
        let exists = classify(RpcError {
            code: -32000,
            message: "ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE".into(),
        });
        assert!(exists.is_already_exists());

        let missing = classify(RpcError {
            code: -32000,
            message: "ENTITY_NOT_FOUND/POSIX_ERROR_ENOENT".into(),
        });
        assert!(matches!(missing, BackendError::NotFound(_)));

        let other = classify(RpcError {
            code: -32602,
            message: "invalid quota".into(),
        });
        assert_eq!(other.to_string(), "rpc error -32602: invalid quota");
    }

    #[test]
    fn decodes_rpc_envelopes() {
        let ok: RpcResponse<VolumeUuidResult> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"1","result":{"volume_uuid":"abc"}}"#)
                .unwrap();
        assert_eq!(ok.result.unwrap().volume_uuid, "abc");

        let err: RpcResponse<VolumeUuidResult> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"2","error":{"code":-32000,"message":"ENTITY_EXISTS_ALREADY/POSIX_ERROR_NONE"}}"#,
        )
        .unwrap();
        assert!(err.result.is_none());
        assert!(classify(err.error.unwrap()).is_already_exists());
    }
}
