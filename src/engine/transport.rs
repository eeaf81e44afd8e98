//! Carriers for engine API requests
//!
//! TCP engines are reached with a blocking reqwest client (TLS material from
//! `DOCKER_CERT_PATH` when configured). Unix socket engines are reached with a
//! hyper HTTP/1 connection driven by a current-thread tokio runtime; response
//! bodies are pulled frame by frame through [`Read`].

use crate::config::{EngineHost, TlsSettings};
use crate::error::{Result, SyncError};
use http::{Method, StatusCode};
use log::debug;
use reqwest::blocking::Client;
use reqwest::{Certificate, Identity};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const CA_FILE: &str = "ca.pem";
pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "key.pem";

const API_VERSION_HEADER: &str = "api-version";

/// Status, negotiated version header and unread body of one engine reply
pub struct EngineResponse {
    pub status: StatusCode,
    pub api_version: Option<String>,
    pub body: Box<dyn Read + Send>,
}

impl EngineResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Remaining body as text; read failures yield what was read so far
    pub fn text(mut self) -> String {
        let mut body = String::new();
        let _ = self.body.read_to_string(&mut body);
        body
    }
}

pub enum Transport {
    Http { client: Client, base: String },
    #[cfg(unix)]
    Unix(unix::UnixTransport),
}

impl Transport {
    pub fn connect(host: &EngineHost, tls: Option<&TlsSettings>, timeout: Option<Duration>) -> Result<Self> {
        match host {
            EngineHost::Tcp(url) => Ok(Transport::Http {
                client: http_client(tls, timeout)?,
                base: url.as_str().trim_end_matches('/').to_string(),
            }),
            #[cfg(unix)]
            EngineHost::Unix(path) => Ok(Transport::Unix(unix::UnixTransport::new(path.clone(), timeout)?)),
            #[cfg(not(unix))]
            EngineHost::Unix(path) => Err(SyncError::ClientConstruction(format!(
                "unix socket {} is not supported on this platform",
                path.display()
            ))),
        }
    }

    /// Send a body-less request to `target` (path and query)
    pub fn send(
        &self,
        method: Method,
        target: &str,
        headers: &[(&'static str, String)],
    ) -> std::result::Result<EngineResponse, BoxError> {
        match self {
            Transport::Http { client, base } => {
                let mut request = client.request(method, format!("{base}{target}"));
                for (name, value) in headers {
                    request = request.header(*name, value.as_str());
                }

                let response = request.send()?;
                Ok(EngineResponse {
                    status: response.status(),
                    api_version: header_text(response.headers()),
                    body: Box::new(response),
                })
            }
            #[cfg(unix)]
            Transport::Unix(transport) => transport.send(method, target, headers),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http { base, .. } => f.write_str(base),
            #[cfg(unix)]
            Transport::Unix(transport) => write!(f, "unix://{}", transport.path().display()),
        }
    }
}

fn header_text(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(API_VERSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn http_client(tls: Option<&TlsSettings>, timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().timeout(timeout).no_proxy();

    if let Some(tls) = tls {
        builder = builder.use_rustls_tls();

        if let Some(dir) = &tls.cert_dir {
            debug!("Loading engine TLS material from {}", dir.display());
            let ca = read_pem(&dir.join(CA_FILE))?;
            let ca = Certificate::from_pem(&ca)
                .map_err(|e| SyncError::ClientConstruction(format!("{CA_FILE}: {e}")))?;

            let mut identity = read_pem(&dir.join(CERT_FILE))?;
            identity.push(b'\n');
            identity.extend(read_pem(&dir.join(KEY_FILE))?);
            let identity = Identity::from_pem(&identity)
                .map_err(|e| SyncError::ClientConstruction(format!("{CERT_FILE}/{KEY_FILE}: {e}")))?;

            builder = builder.add_root_certificate(ca).identity(identity);
        }

        if !tls.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
    }

    builder
        .build()
        .map_err(|e| SyncError::ClientConstruction(e.to_string()))
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| SyncError::ClientConstruction(format!("read {}: {e}", path.display())))
}

#[cfg(unix)]
mod unix {
    use super::{BoxError, EngineResponse, header_text};
    use crate::error::{Result, SyncError};
    use http::Method;
    use http::header::HOST;
    use http_body_util::{BodyExt as _, Empty};
    use hyper::body::{Bytes, Incoming};
    use hyper::client::conn::http1::{self, SendRequest};
    use hyper_util::rt::TokioIo;
    use log::debug;
    use std::io::{self, Read};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UnixStream;
    use tokio::runtime::{Builder, Runtime};

    /// Host header sent over the socket; the engine ignores its value
    const SOCKET_HOST: &str = "docker";

    pub struct UnixTransport {
        path: PathBuf,
        timeout: Option<Duration>,
        runtime: Arc<Runtime>,
    }

    impl UnixTransport {
        pub fn new(path: PathBuf, timeout: Option<Duration>) -> Result<Self> {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| SyncError::ClientConstruction(format!("runtime: {e}")))?;

            Ok(Self {
                path,
                timeout,
                runtime: Arc::new(runtime),
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// One connection per request; the timeout covers connect and response head
        pub fn send(
            &self,
            method: Method,
            target: &str,
            headers: &[(&'static str, String)],
        ) -> std::result::Result<EngineResponse, BoxError> {
            let mut builder = http::Request::builder()
                .method(method)
                .uri(target)
                .header(HOST, SOCKET_HOST);
            for (name, value) in headers {
                builder = builder.header(*name, value.as_str());
            }
            let request = builder.body(Empty::<Bytes>::new())?;

            let path = self.path.clone();
            let exchange = async move {
                let stream = UnixStream::connect(&path).await?;
                let (mut sender, connection) = http1::handshake(TokioIo::new(stream)).await?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        debug!("engine connection closed: {}", e);
                    }
                });

                let response = sender.send_request(request).await?;
                Ok::<_, BoxError>((sender, response))
            };

            let (sender, response) = match self.timeout {
                Some(limit) => self
                    .runtime
                    .block_on(async { tokio::time::timeout(limit, exchange).await })??,
                None => self.runtime.block_on(exchange)?,
            };

            let status = response.status();
            let api_version = header_text(response.headers());
            Ok(EngineResponse {
                status,
                api_version,
                body: Box::new(SocketBody {
                    runtime: Arc::clone(&self.runtime),
                    body: response.into_body(),
                    pending: Bytes::new(),
                    _sender: sender,
                }),
            })
        }
    }

    /// Response body read synchronously off the runtime
    struct SocketBody {
        runtime: Arc<Runtime>,
        body: Incoming,
        pending: Bytes,
        _sender: SendRequest<Empty<Bytes>>,
    }

    impl Read for SocketBody {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            while self.pending.is_empty() {
                match self.runtime.block_on(self.body.frame()) {
                    None => return Ok(0),
                    Some(Ok(frame)) => {
                        if let Ok(data) = frame.into_data() {
                            self.pending = data;
                        }
                    }
                    Some(Err(e)) => return Err(io::Error::other(e)),
                }
            }

            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending.split_to(n));
            Ok(n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    #[test]
    fn test_missing_cert_dir_fails_construction() {
        let tls = TlsSettings {
            verify: true,
            cert_dir: Some(PathBuf::from("/nonexistent/image-sinker/certs")),
        };
        let err = http_client(Some(&tls), None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ClientConstruction);
        assert!(err.to_string().contains(CA_FILE));
    }

    #[test]
    fn test_tls_without_cert_dir_builds() {
        let tls = TlsSettings {
            verify: false,
            cert_dir: None,
        };
        assert!(http_client(Some(&tls), Some(Duration::from_secs(1))).is_ok());
    }

    #[test]
    fn test_response_text() {
        let response = EngineResponse {
            status: StatusCode::NOT_FOUND,
            api_version: None,
            body: Box::new(std::io::Cursor::new(b"{\"message\":\"gone\"}".to_vec())),
        };
        assert!(!response.is_success());
        assert_eq!(response.text(), "{\"message\":\"gone\"}");
    }
}
