use super::auth::TokenService;
use super::{LookupError, RegistryClient, settle};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DOCKER_HUB_API: &str = "https://hub.docker.com";
pub const DOCKER_AUTH: &str = "https://auth.docker.io";
pub const DOCKER_REGISTRY: &str = "https://registry-1.docker.io";
const DOCKER_REGISTRY_SERVICE: &str = "registry.docker.io";

/// Upper bound on tags fetched from the registry tag listing
const TAG_LIST_LIMIT: usize = 1000;

/// Base URLs of the three Docker Hub services the client talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DockerHubEndpoints {
    /// Hub REST API (repository/tag metadata)
    pub hub_api: String,
    /// Token service issuing pull-scoped bearer tokens
    pub auth: String,
    /// Registry v2 API
    pub registry: String,
}

impl Default for DockerHubEndpoints {
    fn default() -> Self {
        Self {
            hub_api: DOCKER_HUB_API.to_string(),
            auth: DOCKER_AUTH.to_string(),
            registry: DOCKER_REGISTRY.to_string(),
        }
    }
}

/// Tag detail from `GET /v2/repositories/{repo}/tags/{tag}`
#[derive(Debug, Deserialize)]
struct HubTag {
    #[serde(default)]
    name: Option<String>,
    /// Digest of the manifest list (or single manifest)
    #[serde(default)]
    digest: Option<String>,
}

/// Response of the registry `GET /v2/{repo}/tags/list`
#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Docker Hub client.
///
/// Digests come from the Hub REST API; tag enumeration goes through the
/// registry v2 tag listing with a pull token, because the Hub tags API
/// paginates and orders unreliably for finding the newest version.
pub struct DockerHubClient {
    client: Client,
    endpoints: DockerHubEndpoints,
    timeout: Duration,
    tokens: TokenService,
}

impl DockerHubClient {
    pub fn new(client: Client, endpoints: DockerHubEndpoints, timeout: Duration) -> Self {
        let realm = format!("{}/token", endpoints.auth.trim_end_matches('/'));
        let tokens = TokenService::new(client.clone(), &realm, DOCKER_REGISTRY_SERVICE, timeout);

        Self {
            client,
            endpoints,
            timeout,
            tokens,
        }
    }

    async fn fetch_digest(&self, repository: &str, tag: &str) -> Result<String, LookupError> {
        let url = format!(
            "{}/v2/repositories/{}/tags/{}",
            self.endpoints.hub_api.trim_end_matches('/'),
            repository,
            tag
        );
        debug!("Fetching Docker Hub tag detail: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::from_transport(e, &url, self.timeout))?;

        if !response.status().is_success() {
            return Err(LookupError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let detail: HubTag = response
            .json()
            .await
            .map_err(|e| LookupError::from_transport(e, &url, self.timeout))?;

        debug!(
            "Docker Hub tag {} has digest {:?}",
            detail.name.as_deref().unwrap_or(tag),
            detail.digest
        );

        detail
            .digest
            .filter(|d| !d.is_empty())
            .ok_or(LookupError::MissingField {
                url,
                field: "digest",
            })
    }

    async fn fetch_tags(&self, repository: &str) -> Result<Vec<String>, LookupError> {
        let token = self.tokens.pull_token(repository).await?;

        let url = format!(
            "{}/v2/{}/tags/list?n={}",
            self.endpoints.registry.trim_end_matches('/'),
            repository,
            TAG_LIST_LIMIT
        );
        debug!("Listing tags: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| LookupError::from_transport(e, &url, self.timeout))?;

        if !response.status().is_success() {
            return Err(LookupError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let list: TagList = response
            .json()
            .await
            .map_err(|e| LookupError::from_transport(e, &url, self.timeout))?;

        let tags = list.tags.unwrap_or_default();
        debug!("Found {} tags for {}", tags.len(), repository);
        Ok(tags)
    }
}

#[async_trait]
impl RegistryClient for DockerHubClient {
    fn family(&self) -> &'static str {
        "dockerhub"
    }

    async fn digest_for_tag(&self, repository: &str, tag: &str) -> Option<String> {
        let what = format!("{}:{}", repository, tag);
        settle(self.family(), &what, self.fetch_digest(repository, tag).await)
    }

    async fn list_tags(&self, repository: &str) -> Option<Vec<String>> {
        settle(self.family(), repository, self.fetch_tags(repository).await)
    }
}
