use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag assumed when a reference carries none
pub const DEFAULT_TAG: &str = "latest";

/// Tags that move with every release, so digest comparison says nothing about them
pub const FLOATING_TAGS: [&str; 2] = ["latest", "stable"];

/// Hostnames that all point at Docker Hub
const DOCKER_HUB_HOSTS: [&str; 3] = ["docker.io", "index.docker.io", "registry-1.docker.io"];

pub fn is_floating_tag(tag: &str) -> bool {
    FLOATING_TAGS.contains(&tag)
}

/// Registry family an image reference resolves to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Registry {
    /// Docker Hub, either implicit or through one of its hostnames
    DockerHub,
    /// GitHub Container Registry (ghcr.io)
    Ghcr,
    /// Any other registry speaking the distribution v2 API, keyed by host[:port]
    Generic(String),
}

impl Registry {
    /// Map an explicit registry host to its family
    pub fn from_host(host: &str) -> Self {
        match host {
            "ghcr.io" => Registry::Ghcr,
            h if DOCKER_HUB_HOSTS.contains(&h) => Registry::DockerHub,
            h => Registry::Generic(h.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Registry::DockerHub => "dockerhub",
            Registry::Ghcr => "ghcr",
            Registry::Generic(host) => host,
        }
    }

    /// Label used for metrics, where arbitrary hosts would explode cardinality
    pub fn family(&self) -> &'static str {
        match self {
            Registry::DockerHub => "dockerhub",
            Registry::Ghcr => "ghcr",
            Registry::Generic(_) => "generic",
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Registry> for String {
    fn from(registry: Registry) -> Self {
        registry.as_str().to_string()
    }
}

impl From<String> for Registry {
    fn from(value: String) -> Self {
        match value.as_str() {
            "dockerhub" => Registry::DockerHub,
            "ghcr" => Registry::Ghcr,
            _ => Registry::from_host(&value),
        }
    }
}

/// A parsed image reference: `[host/]repository[:tag][@digest]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    /// The string as it appeared in the manifest
    pub raw: String,
    pub registry: Registry,
    /// Explicit host segment, if the reference named one
    pub registry_host: Option<String>,
    /// Repository path without host or tag (`library/nginx`, `org/app`)
    pub repository: String,
    /// Never empty; defaults to `latest`
    pub tag: String,
    /// `@sha256:...` pin, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ImageReference {
    /// Whether the tag is `latest` or `stable`
    pub fn is_floating(&self) -> bool {
        is_floating_tag(&self.tag)
    }

    /// Fully qualified form, e.g. `docker.io/library/nginx:1.27`
    pub fn normalized(&self) -> String {
        let host = match (&self.registry_host, &self.registry) {
            (Some(host), _) => host.as_str(),
            (None, Registry::DockerHub) => "docker.io",
            (None, other) => other.as_str(),
        };
        format!("{}/{}:{}", host, self.repository, self.tag)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

/// Result of a single digest lookup. `digest` is `None` whenever the
/// registry could not answer (auth, network, timeout, 404).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRecord {
    pub reference: ImageReference,
    pub digest: Option<String>,
}

impl DigestRecord {
    pub fn new(reference: ImageReference, digest: Option<String>) -> Self {
        Self { reference, digest }
    }

    pub fn is_resolved(&self) -> bool {
        self.digest.is_some()
    }
}
