//! Configuration management module

use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_PROGRESS_EVERY: usize = 25;

/// When the stream consumer surfaces a progress line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPolicy {
    /// Every n-th line, starting with the first
    EveryNth(usize),
    /// The first line, then at most once per interval
    Interval(Duration),
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        ProgressPolicy::EveryNth(DEFAULT_PROGRESS_EVERY)
    }
}

/// Retry policy per class of engine operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicies {
    pub pull: RetryPolicy,
    pub push: RetryPolicy,
    pub tag: RetryPolicy,
}

impl RetryPolicies {
    pub fn uniform(policy: RetryPolicy) -> Self {
        Self {
            pull: policy,
            push: policy,
            tag: policy,
        }
    }

    fn all(&self) -> [(&'static str, &RetryPolicy); 3] {
        [("pull", &self.pull), ("push", &self.push), ("tag", &self.tag)]
    }
}

/// Settings for syncing images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    pub retry: RetryPolicies,
    pub progress: ProgressPolicy,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, policy) in self.retry.all() {
            if policy.attempts == 0 {
                return Err(SyncError::Config(format!(
                    "{name} retry attempts must be greater than 0"
                )));
            }
        }

        match self.progress {
            ProgressPolicy::EveryNth(0) => Err(SyncError::Config(
                "progress interval must be greater than 0".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Create config from environment variables and defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = RetryPolicy::default();
        if let Some(attempts) = lookup("SINKER_RETRY_ATTEMPTS").and_then(|v| v.parse().ok()) {
            policy.attempts = attempts;
        }
        if let Some(secs) = lookup("SINKER_RETRY_DELAY_SECS").and_then(|v| v.parse().ok()) {
            policy.delay = Duration::from_secs(secs);
        }
        if let Some(backoff) = lookup("SINKER_RETRY_BACKOFF").and_then(|v| v.parse().ok()) {
            policy.backoff = backoff;
        }

        let mut config = Self {
            retry: RetryPolicies::uniform(policy),
            progress: ProgressPolicy::default(),
        };

        if let Some(every) = lookup("SINKER_PROGRESS_EVERY").and_then(|v| v.parse().ok()) {
            config.progress = ProgressPolicy::EveryNth(every);
        }
        // a time-based interval wins over a line count
        if let Some(secs) = lookup("SINKER_PROGRESS_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            config.progress = ProgressPolicy::Interval(Duration::from_secs(secs));
        }

        config
    }
}

/// Address of the container engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineHost {
    /// `tcp://`, `http://` or `https://` endpoint
    Tcp(Url),
    /// Local socket of a `unix://` host
    Unix(PathBuf),
}

impl fmt::Display for EngineHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineHost::Tcp(url) => write!(f, "{url}"),
            EngineHost::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// TLS towards a TCP engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// Verify the engine certificate against the configured CA
    pub verify: bool,
    /// Directory holding `ca.pem`, `cert.pem` and `key.pem`
    pub cert_dir: Option<PathBuf>,
}

/// Where and how to reach the container engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub host: EngineHost,
    pub tls: Option<TlsSettings>,
    /// Fixed API version; negotiated with the engine when unset
    pub api_version: Option<String>,
    /// Request timeout; pulls of large images can run for a long time
    pub timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn new(host: &str) -> Result<Self> {
        Ok(Self {
            host: parse_engine_host(host, false)?,
            tls: None,
            api_version: None,
            timeout: None,
        })
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `DOCKER_HOST`, `DOCKER_TLS_VERIFY`, `DOCKER_CERT_PATH` and `DOCKER_API_VERSION`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_host = lookup("DOCKER_HOST")
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string());
        let verify = lookup("DOCKER_TLS_VERIFY")
            .map(|value| !value.is_empty() && value != "0")
            .unwrap_or(false);
        let cert_dir = lookup("DOCKER_CERT_PATH")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let tls = (verify || cert_dir.is_some()).then_some(TlsSettings { verify, cert_dir });
        let host = parse_engine_host(&raw_host, tls.is_some())?;

        Ok(Self {
            // TLS only applies to TCP engines
            tls: tls.filter(|_| matches!(host, EngineHost::Tcp(_))),
            host,
            api_version: lookup("DOCKER_API_VERSION").filter(|v| !v.is_empty()),
            timeout: None,
        })
    }
}

fn parse_engine_host(raw: &str, tls: bool) -> Result<EngineHost> {
    if let Some(path) = raw.strip_prefix("unix://") {
        if path.is_empty() {
            return Err(SyncError::ClientConstruction(format!(
                "invalid engine host {raw}: missing socket path"
            )));
        }
        return Ok(EngineHost::Unix(PathBuf::from(path)));
    }

    let normalized = match raw.strip_prefix("tcp://") {
        Some(address) if tls => format!("https://{address}"),
        Some(address) => format!("http://{address}"),
        None => raw.to_string(),
    };

    let url = Url::parse(&normalized)
        .map_err(|e| SyncError::ClientConstruction(format!("invalid engine host {raw}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(EngineHost::Tcp(url)),
        scheme => Err(SyncError::ClientConstruction(format!(
            "unsupported engine host scheme {scheme} in {raw}"
        ))),
    }
}
