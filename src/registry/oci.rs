use super::{LookupError, RegistryClient, settle};
use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const GHCR_HOST: &str = "ghcr.io";

/// Manifest digest lookups against any distribution v2 registry.
///
/// Anonymous access only: the client follows the registry's bearer
/// challenge to obtain a pull token, then resolves the manifest digest.
#[derive(Clone)]
pub struct OciDigestClient {
    client: Arc<Client>,
    timeout: Duration,
}

impl OciDigestClient {
    /// `insecure_registries` lists `host[:port]` entries reached over plain HTTP
    pub fn new(insecure_registries: &[String], timeout: Duration) -> Self {
        let protocol = if insecure_registries.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(insecure_registries.to_vec())
        };

        let client = Client::new(ClientConfig {
            protocol,
            ..Default::default()
        });

        Self {
            client: Arc::new(client),
            timeout,
        }
    }

    pub async fn fetch_digest(
        &self,
        host: &str,
        repository: &str,
        tag: &str,
    ) -> Result<String, LookupError> {
        let reference = Reference::with_tag(
            host.to_string(),
            repository.to_string(),
            tag.to_string(),
        );
        debug!("Fetching manifest digest for {}", reference);

        let lookup = self
            .client
            .fetch_manifest_digest(&reference, &RegistryAuth::Anonymous);

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(digest)) => Ok(digest),
            Ok(Err(e)) => Err(LookupError::Registry(e.to_string())),
            Err(_) => Err(LookupError::Timeout {
                url: format!("{}/v2/{}/manifests/{}", host, repository, tag),
                timeout: self.timeout,
            }),
        }
    }
}

/// GitHub Container Registry
pub struct GhcrClient {
    oci: OciDigestClient,
}

impl GhcrClient {
    pub fn new(oci: OciDigestClient) -> Self {
        Self { oci }
    }
}

#[async_trait]
impl RegistryClient for GhcrClient {
    fn family(&self) -> &'static str {
        "ghcr"
    }

    async fn digest_for_tag(&self, repository: &str, tag: &str) -> Option<String> {
        let what = format!("{}/{}:{}", GHCR_HOST, repository, tag);
        settle(
            self.family(),
            &what,
            self.oci.fetch_digest(GHCR_HOST, repository, tag).await,
        )
    }
}

/// Any other registry implementing the distribution v2 API
pub struct GenericV2Client {
    host: String,
    oci: OciDigestClient,
}

impl GenericV2Client {
    pub fn new(host: &str, oci: OciDigestClient) -> Self {
        Self {
            host: host.to_string(),
            oci,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl RegistryClient for GenericV2Client {
    fn family(&self) -> &'static str {
        "generic"
    }

    async fn digest_for_tag(&self, repository: &str, tag: &str) -> Option<String> {
        let what = format!("{}/{}:{}", self.host, repository, tag);
        settle(
            self.family(),
            &what,
            self.oci.fetch_digest(&self.host, repository, tag).await,
        )
    }
}
