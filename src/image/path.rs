//! Registry path decomposition
//!
//! A registry path has the loose shape `[host[:port]/]repository[:tag][@digest]`.
//! No grammar is enforced: every string yields some (possibly empty) value for
//! each projection.
//!
//! Known limitation: a host with an explicit port (`registry.example.com:5000/app`)
//! is not told apart from a tag separator. The text after the first `:` is
//! treated as the tag, so such paths decompose into unhelpful projections
//! unless they carry a digest.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Registry path for a container image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryPath(String);

impl RegistryPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text after the first `@`, empty if there is none
    pub fn digest(&self) -> &str {
        match self.0.split_once('@') {
            Some((_, digest)) => digest,
            None => "",
        }
    }

    /// Text between the first and second `:`, empty for digest paths
    pub fn tag(&self) -> &str {
        if self.0.contains('@') {
            return "";
        }

        self.0.split(':').nth(1).unwrap_or("")
    }

    /// First `/` segment when it looks like a hostname (contains a `.`)
    pub fn host(&self) -> &str {
        let untagged = self.untagged();
        let candidate = untagged.split('/').next().unwrap_or_default();
        if !candidate.contains('.') {
            return "";
        }

        self.0.split('/').next().unwrap_or_default()
    }

    /// Path with host, tag and digest removed
    pub fn repository(&self) -> String {
        let mut repository = self.untagged().into_owned();

        let digest = self.digest();
        if !digest.is_empty() {
            repository = repository.replace(&format!("@{digest}"), "");
        }

        let host = self.host();
        if !host.is_empty() {
            if let Some(stripped) = repository.strip_prefix(host) {
                repository = stripped.to_string();
            }
        }

        repository.trim_start_matches('/').to_string()
    }

    /// Host and repository joined, without tag or digest
    pub fn name(&self) -> String {
        let host = self.host();
        let repository = self.repository();
        if host.is_empty() {
            repository
        } else {
            format!("{host}/{repository}")
        }
    }

    fn untagged(&self) -> Cow<'_, str> {
        let tag = self.tag();
        if tag.is_empty() {
            Cow::Borrowed(self.0.as_str())
        } else {
            Cow::Owned(self.0.replace(&format!(":{tag}"), ""))
        }
    }
}

impl fmt::Display for RegistryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistryPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RegistryPath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for RegistryPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl AsRef<str> for RegistryPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(path: &str) -> (String, String, String, String) {
        let path = RegistryPath::from(path);
        (
            path.host().to_string(),
            path.repository(),
            path.tag().to_string(),
            path.digest().to_string(),
        )
    }

    #[test]
    fn test_host_repository_and_tag() {
        let path = RegistryPath::from("docker.io/library/nginx:1.21");
        assert_eq!(path.host(), "docker.io");
        assert_eq!(path.repository(), "library/nginx");
        assert_eq!(path.tag(), "1.21");
        assert_eq!(path.digest(), "");
    }

    #[test]
    fn test_no_host() {
        let path = RegistryPath::from("app:latest");
        assert_eq!(path.host(), "");
        assert_eq!(path.repository(), "app");
        assert_eq!(path.tag(), "latest");
        assert_eq!(path.digest(), "");
    }

    #[test]
    fn test_digest_takes_precedence() {
        let path = RegistryPath::from("myregistry.internal/app@sha256:deadbeef");
        assert_eq!(path.host(), "myregistry.internal");
        assert_eq!(path.repository(), "app");
        assert_eq!(path.tag(), "");
        assert_eq!(path.digest(), "sha256:deadbeef");

        let tagged = RegistryPath::from("quay.io/team/app:v2@sha256:0123abcd");
        assert_eq!(tagged.tag(), "");
        assert_eq!(tagged.digest(), "sha256:0123abcd");
    }

    #[test]
    fn test_namespace_segment_is_not_a_host() {
        let path = RegistryPath::from("library/nginx:1.21");
        assert_eq!(path.host(), "");
        assert_eq!(path.repository(), "library/nginx");
        assert_eq!(path.name(), "library/nginx");
    }

    #[test]
    fn test_port_with_digest() {
        let path = RegistryPath::from("myregistry.internal:5000/team/app@sha256:abcd");
        assert_eq!(path.host(), "myregistry.internal:5000");
        assert_eq!(path.repository(), "team/app");
        assert_eq!(path.tag(), "");
        assert_eq!(path.digest(), "sha256:abcd");
    }

    #[test]
    fn test_port_is_read_as_tag() {
        let path = RegistryPath::from("registry.example.com:5000/team/app");
        assert_eq!(path.tag(), "5000/team/app");
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(parts(""), (String::new(), String::new(), String::new(), String::new()));
        assert_eq!(parts("/"), (String::new(), String::new(), String::new(), String::new()));
        assert_eq!(parts("app").1, "app");
        assert_eq!(parts("app:").1, "app:");
        assert_eq!(parts("@").3, "");
    }

    #[test]
    fn test_reassembled_path_parses_the_same() {
        let inputs = [
            "docker.io/library/nginx:1.21",
            "app:latest",
            "app",
            "ghcr.io/org/tool",
            "myregistry.internal/app@sha256:deadbeef",
            "team/app@sha256:cafe",
        ];

        for input in inputs {
            let (host, repository, tag, digest) = parts(input);
            let mut rebuilt = String::new();
            if !host.is_empty() {
                rebuilt.push_str(&host);
                rebuilt.push('/');
            }
            rebuilt.push_str(&repository);
            if !tag.is_empty() {
                rebuilt.push(':');
                rebuilt.push_str(&tag);
            }
            if !digest.is_empty() {
                rebuilt.push('@');
                rebuilt.push_str(&digest);
            }

            assert_eq!(parts(&rebuilt), (host, repository, tag, digest), "{input}");
        }
    }

    #[test]
    fn test_serde_is_transparent() {
        let path: RegistryPath = serde_json::from_str("\"app:latest\"").unwrap();
        assert_eq!(path.tag(), "latest");
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"app:latest\"");
    }
}
