//! Docker engine API client
//!
//! Requests go over the engine's unix socket or TCP, see [`Transport`].
//! Pull and push replies are handed back unread so the caller can stream
//! them line by line.

use super::ImageEngine;
use super::transport::{EngineResponse, Transport};
use crate::config::EngineConfig;
use crate::error::{Result, SyncError};
use crate::image::RegistryPath;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use http::{Method, StatusCode};
use log::{debug, info};
use serde::Deserialize;
use std::io::{BufReader, Read};
use url::form_urlencoded;

/// Highest API version this client speaks
pub const MAX_API_VERSION: &str = "1.43";
/// Assumed when the engine does not advertise a version
pub const FALLBACK_API_VERSION: &str = "1.24";

const REGISTRY_AUTH_HEADER: &str = "x-registry-auth";

pub type StatusStream = BufReader<Box<dyn Read + Send>>;

#[derive(Deserialize)]
struct EngineMessage {
    message: String,
}

pub struct EngineClient {
    transport: Transport,
    api_version: String,
}

impl EngineClient {
    /// Client configured from `DOCKER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env()?)
    }

    /// Build the client and settle the API version.
    ///
    /// Fails without retrying when the engine cannot be reached.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let EngineConfig {
            host,
            tls,
            api_version,
            timeout,
        } = config;

        let transport = Transport::connect(&host, tls.as_ref(), timeout)?;
        let api_version = match api_version {
            Some(version) => version,
            None => negotiate_api_version(&transport)?,
        };
        info!("Using engine at {} with API version {}", host, api_version);

        Ok(Self {
            transport,
            api_version,
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Versioned request target with an encoded query
    fn target(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut target = format!("/v{}{}", self.api_version, path);
        if !query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            target.push('?');
            target.push_str(&encoded);
        }
        target
    }

    fn request(
        &self,
        operation: &'static str,
        method: Method,
        target: &str,
        headers: &[(&'static str, String)],
    ) -> Result<EngineResponse> {
        debug!("{} {}", method, target);
        self.transport
            .send(method, target, headers)
            .map_err(|source| SyncError::Transport { operation, source })
    }

    fn send(
        &self,
        operation: &'static str,
        method: Method,
        target: &str,
        headers: &[(&'static str, String)],
    ) -> Result<EngineResponse> {
        let response = self.request(operation, method, target, headers)?;
        debug!("{} responded {}", operation, response.status);

        if response.is_success() {
            Ok(response)
        } else {
            Err(engine_error(operation, response))
        }
    }
}

impl ImageEngine for EngineClient {
    type Stream = StatusStream;

    fn image_pull(&self, image: &RegistryPath) -> Result<StatusStream> {
        let mut query = vec![("fromImage", image.as_str())];
        if image.tag().is_empty() && image.digest().is_empty() {
            query.push(("tag", "latest"));
        }
        let target = self.target("/images/create", &query);

        let response = self.send("image pull", Method::POST, &target, &[])?;
        Ok(BufReader::new(response.body))
    }

    fn image_push(&self, image: &RegistryPath) -> Result<StatusStream> {
        let mut query = Vec::new();
        if !image.tag().is_empty() {
            query.push(("tag", image.tag()));
        }
        let target = self.target(&format!("/images/{}/push", image.name()), &query);
        let auth = [(REGISTRY_AUTH_HEADER, URL_SAFE.encode("{}"))];

        let response = self.send("image push", Method::POST, &target, &auth)?;
        Ok(BufReader::new(response.body))
    }

    fn image_tag(&self, source: &RegistryPath, target: &RegistryPath) -> Result<()> {
        let tag = match target.tag() {
            "" => "latest",
            tag => tag,
        };
        let repo = target.name();
        let request = self.target(
            &format!("/images/{}/tag", source),
            &[("repo", repo.as_str()), ("tag", tag)],
        );

        self.send("image tag", Method::POST, &request, &[])?;
        Ok(())
    }

    fn image_exists(&self, image: &RegistryPath) -> Result<bool> {
        let target = self.target(&format!("/images/{}/json", image), &[]);
        let response = self.request("image inspect", Method::GET, &target, &[])?;

        match response.status {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(engine_error("image inspect", response)),
        }
    }
}

fn negotiate_api_version(transport: &Transport) -> Result<String> {
    let response = transport
        .send(Method::GET, "/_ping", &[])
        .map_err(|e| SyncError::ClientConstruction(format!("ping {transport}: {e}")))?;

    if !response.is_success() {
        return Err(SyncError::ClientConstruction(format!(
            "ping {transport}: engine responded {}",
            response.status
        )));
    }

    debug!("Engine advertises API version {:?}", response.api_version);
    Ok(select_api_version(response.api_version.as_deref()))
}

/// Lower of the advertised version and [`MAX_API_VERSION`]
fn select_api_version(advertised: Option<&str>) -> String {
    let Some(advertised) = advertised.and_then(|v| parse_version(v).map(|parsed| (v, parsed))) else {
        return FALLBACK_API_VERSION.to_string();
    };

    match parse_version(MAX_API_VERSION) {
        Some(max) if advertised.1 > max => MAX_API_VERSION.to_string(),
        _ => advertised.0.to_string(),
    }
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.trim().split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn engine_error(operation: &'static str, response: EngineResponse) -> SyncError {
    let status = response.status;
    let body = response.text();
    let message = match serde_json::from_str::<EngineMessage>(&body) {
        Ok(parsed) => parsed.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };

    SyncError::Engine {
        operation,
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_api_version() {
        assert_eq!(select_api_version(Some("1.41")), "1.41");
        assert_eq!(select_api_version(Some("1.47")), MAX_API_VERSION);
        assert_eq!(select_api_version(Some("2.0")), MAX_API_VERSION);
        assert_eq!(select_api_version(None), FALLBACK_API_VERSION);
        assert_eq!(select_api_version(Some("garbage")), FALLBACK_API_VERSION);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.43"), Some((1, 43)));
        assert_eq!(parse_version("1"), None);
        assert_eq!(parse_version("1.x"), None);
    }

    #[test]
    fn test_fixed_version_skips_negotiation() {
        // nothing listens on port 9; negotiation would fail
        let config = EngineConfig::new("tcp://127.0.0.1:9")
            .unwrap()
            .with_api_version("1.40");
        let client = EngineClient::new(config).unwrap();
        assert_eq!(client.api_version(), "1.40");
        assert_eq!(client.target("/images/create", &[]), "/v1.40/images/create");
        assert_eq!(
            client.target("/images/app:1/tag", &[("repo", "r.io/team/app"), ("tag", "1")]),
            "/v1.40/images/app:1/tag?repo=r.io%2Fteam%2Fapp&tag=1"
        );
    }

    #[test]
    fn test_unreachable_engine_fails_construction() {
        let config = EngineConfig::new("tcp://127.0.0.1:9").unwrap();
        let err = EngineClient::new(config).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::ClientConstruction);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_socket_fails_construction() {
        let config = EngineConfig::new("unix:///nonexistent/image-sinker/engine.sock").unwrap();
        let err = EngineClient::new(config).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::ClientConstruction);
        assert!(err.to_string().contains("unix:///nonexistent/image-sinker/engine.sock"));
    }
}
