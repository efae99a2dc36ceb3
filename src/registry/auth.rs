use super::LookupError;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Token endpoint response. Docker's auth service sends `token`, some
/// registries only send the OAuth2 style `access_token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Fetches anonymous pull-scoped bearer tokens from a registry token service
pub struct TokenService {
    client: Client,
    /// Token endpoint, e.g. `https://auth.docker.io/token`
    realm: String,
    /// `service` query parameter, e.g. `registry.docker.io`
    service: String,
    timeout: Duration,
    /// Cache of scope -> token, valid for the lifetime of one scan
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenService {
    pub fn new(client: Client, realm: &str, service: &str, timeout: Duration) -> Self {
        Self {
            client,
            realm: realm.to_string(),
            service: service.to_string(),
            timeout,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Get a `repository:<repo>:pull` token for a repository
    pub async fn pull_token(&self, repository: &str) -> Result<String, LookupError> {
        let scope = pull_scope(repository);

        if let Some(token) = self.tokens.read().await.get(&scope) {
            debug!("Using cached token for {}", scope);
            return Ok(token.clone());
        }

        let url = format!("{}?service={}&scope={}", self.realm, self.service, scope);
        debug!("Requesting token for {} from {}", scope, self.realm);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::from_transport(e, &self.realm, self.timeout))?;

        if !response.status().is_success() {
            return Err(LookupError::Auth {
                scope,
                status: response.status().as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| LookupError::from_transport(e, &self.realm, self.timeout))?;

        let token = body
            .token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LookupError::MissingField {
                url: self.realm.clone(),
                field: "token",
            })?;

        self.tokens.write().await.insert(scope, token.clone());
        Ok(token)
    }
}

pub(crate) fn pull_scope(repository: &str) -> String {
    format!("repository:{}:pull", repository)
}
