mod auth;
mod dockerhub;
mod oci;

pub use self::auth::TokenService;
pub use self::dockerhub::{DockerHubClient, DockerHubEndpoints};
pub use self::oci::{GenericV2Client, GhcrClient, OciDigestClient};

use crate::config::RegistryConfig;
use crate::metrics::{REGISTRY_REQUEST_FAILURES, REGISTRY_REQUESTS_TOTAL};
use crate::models::Registry;
use crate::policy::select_latest_version;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a single registry lookup produced no answer.
///
/// These never abort a scan; callers log them and degrade to `None`.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("authentication failed for scope {scope}: HTTP {status}")]
    Auth { scope: String, status: u16 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("response from {url} has no '{field}' field")]
    MissingField { url: String, field: &'static str },

    #[error("registry error: {0}")]
    Registry(String),
}

impl LookupError {
    /// Short reason label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            LookupError::Timeout { .. } => "timeout",
            LookupError::Network(_) => "network",
            LookupError::Auth { .. } => "auth",
            LookupError::Status { status: 404, .. } => "not_found",
            LookupError::Status { .. } => "status",
            LookupError::MissingField { .. } => "malformed",
            LookupError::Registry(_) => "registry",
        }
    }

    /// Classify a transport error, separating out timeouts
    pub fn from_transport(err: reqwest::Error, url: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            LookupError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            LookupError::Network(err)
        }
    }
}

/// Capabilities a registry family offers to the update checker.
///
/// Every method answers `None` when the registry cannot be asked or does
/// not know; failures are never propagated to the caller.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Registry family label (`dockerhub`, `ghcr`, `generic`)
    fn family(&self) -> &'static str;

    /// Content digest of `repository:tag`
    async fn digest_for_tag(&self, repository: &str, tag: &str) -> Option<String>;

    /// All tags of a repository, if the family supports listing them
    async fn list_tags(&self, _repository: &str) -> Option<Vec<String>> {
        None
    }

    /// Highest clean version tag of a repository
    async fn latest_version_tag(&self, repository: &str) -> Option<String> {
        let tags = self.list_tags(repository).await?;
        select_latest_version(&tags)
    }
}

/// Turn a lookup result into the `Option` the trait hands out, counting it
pub(crate) fn settle<T>(
    family: &'static str,
    what: &str,
    result: Result<T, LookupError>,
) -> Option<T> {
    REGISTRY_REQUESTS_TOTAL.with_label_values(&[family]).inc();
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            REGISTRY_REQUEST_FAILURES
                .with_label_values(&[family, e.reason()])
                .inc();
            debug!("{} lookup for {} failed: {}", family, what, e);
            None
        },
    }
}

type GenericFactory = Box<dyn Fn(&str) -> Arc<dyn RegistryClient> + Send + Sync>;

/// Picks the client implementation for a parsed [`Registry`]
pub struct RegistryClients {
    dockerhub: Arc<dyn RegistryClient>,
    ghcr: Arc<dyn RegistryClient>,
    generic: GenericFactory,
}

impl RegistryClients {
    pub fn new(
        dockerhub: Arc<dyn RegistryClient>,
        ghcr: Arc<dyn RegistryClient>,
        generic: impl Fn(&str) -> Arc<dyn RegistryClient> + Send + Sync + 'static,
    ) -> Self {
        Self {
            dockerhub,
            ghcr,
            generic: Box::new(generic),
        }
    }

    /// Build the production clients from configuration.
    ///
    /// Fails only when the HTTP client itself cannot be constructed, which
    /// means no registry can be reached at all.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, LookupError> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        let dockerhub = Arc::new(DockerHubClient::new(
            http,
            config.dockerhub.clone(),
            timeout,
        ));
        let oci = OciDigestClient::new(&config.insecure_registries, timeout);
        let ghcr = Arc::new(GhcrClient::new(oci.clone()));

        Ok(Self::new(dockerhub, ghcr, move |host| {
            Arc::new(GenericV2Client::new(host, oci.clone())) as Arc<dyn RegistryClient>
        }))
    }

    pub fn client_for(&self, registry: &Registry) -> Arc<dyn RegistryClient> {
        match registry {
            Registry::DockerHub => Arc::clone(&self.dockerhub),
            Registry::Ghcr => Arc::clone(&self.ghcr),
            Registry::Generic(host) => (self.generic)(host),
        }
    }
}
