mod manifest;

pub use self::manifest::{Manifest, extract_images, find_manifests};

use crate::metrics::{IMAGES_CHECKED, MANIFESTS_SCANNED, SCAN_DURATION};
use crate::models::{DEFAULT_TAG, DigestRecord, ScanEntry, UpdateStatus};
use crate::policy::{UpdateEvaluator, select_latest_version, short_digest, suggest_upgrade};
use crate::reference;
use crate::registry::RegistryClients;
use crate::report::{ReportAggregator, ScanReport};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no compose manifests under {root} match {patterns:?}")]
    NoManifestsFound {
        root: PathBuf,
        patterns: Vec<String>,
    },

    #[error("no image references found in manifests under {root}")]
    NoImagesFound { root: PathBuf },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One image string as it appears in one manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageOccurrence {
    pub source_file: String,
    pub raw_image: String,
}

impl ImageOccurrence {
    pub fn new(source_file: impl Into<String>, raw_image: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            raw_image: raw_image.into(),
        }
    }
}

/// Everything learned about one distinct image string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCheck {
    /// The parsed reference and the digest it runs: the `@digest` pin if
    /// present, otherwise the digest of its tag
    pub current: DigestRecord,
    pub latest_digest: Option<String>,
    pub latest_version_tag: Option<String>,
    pub suggested_tag: Option<String>,
    pub status: UpdateStatus,
}

pub struct Scanner {
    clients: RegistryClients,
    evaluator: UpdateEvaluator,
    concurrency: usize,
}

impl Scanner {
    pub fn new(clients: RegistryClients, concurrency: usize) -> Self {
        Self {
            clients,
            evaluator: UpdateEvaluator,
            concurrency: concurrency.max(1),
        }
    }

    /// Scan every manifest under `root` matching `patterns`
    pub async fn scan(&self, root: &Path, patterns: &[String]) -> Result<ScanReport, ScanError> {
        let timer = SCAN_DURATION.start_timer();

        let paths = find_manifests(root, patterns)?;
        if paths.is_empty() {
            return Err(ScanError::NoManifestsFound {
                root: root.to_path_buf(),
                patterns: patterns.to_vec(),
            });
        }
        info!("Found {} compose manifests under {}", paths.len(), root.display());

        let mut occurrences = Vec::new();
        let mut manifests = 0;
        for path in &paths {
            let manifest = match Manifest::load(root, path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                },
            };
            MANIFESTS_SCANNED.inc();
            manifests += 1;
            debug!(
                "{} references {} images",
                manifest.display_path,
                manifest.images.len()
            );
            occurrences.extend(
                manifest
                    .images
                    .into_iter()
                    .map(|image| ImageOccurrence::new(manifest.display_path.clone(), image)),
            );
        }

        if occurrences.is_empty() {
            return Err(ScanError::NoImagesFound {
                root: root.to_path_buf(),
            });
        }

        let report = self
            .check_occurrences(occurrences)
            .await
            .finish(root.display().to_string(), manifests);

        timer.observe_duration();
        info!(
            "Checked {} images: {} with updates, {} unknown",
            report.total(),
            report.counts.update_available,
            report.counts.unknown
        );
        Ok(report)
    }

    /// Check every occurrence and aggregate the results.
    ///
    /// Duplicate `(file, image)` pairs are dropped before any lookup, and an
    /// image string used by several manifests is looked up once. At most
    /// `concurrency` images are in flight; results keep occurrence order.
    pub async fn check_occurrences(&self, occurrences: Vec<ImageOccurrence>) -> ReportAggregator {
        let mut seen = HashSet::new();
        let occurrences: Vec<ImageOccurrence> = occurrences
            .into_iter()
            .filter(|occurrence| seen.insert(occurrence.clone()))
            .collect();

        let mut distinct = HashSet::new();
        let images: Vec<String> = occurrences
            .iter()
            .filter(|o| distinct.insert(o.raw_image.clone()))
            .map(|o| o.raw_image.clone())
            .collect();

        let checks: HashMap<String, ImageCheck> = stream::iter(images)
            .map(|raw| async move {
                let check = self.check_image(&raw).await;
                (raw, check)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut aggregator = ReportAggregator::new();
        for occurrence in occurrences {
            let Some(check) = checks.get(&occurrence.raw_image) else {
                continue;
            };
            aggregator.record(ScanEntry {
                source_file: occurrence.source_file,
                raw_image: occurrence.raw_image,
                reference: check.current.reference.clone(),
                status: check.status.clone(),
                suggested_tag: check.suggested_tag.clone(),
            });
        }
        aggregator
    }

    /// Look up and classify a single image string.
    ///
    /// A reference pinned with `@digest` runs exactly that content, so the pin
    /// stands in for the current digest and the tag is not looked up. The
    /// `latest` digest is only fetched for non-floating tags, since a
    /// floating tag is reported as such regardless. When both digests are
    /// known and differ, the newest version tag is resolved from the tag
    /// listing. That tag is the highest clean version, which is not
    /// guaranteed to be the one `latest` points at.
    pub async fn check_image(&self, raw: &str) -> ImageCheck {
        IMAGES_CHECKED.inc();
        let reference = reference::parse(raw);
        let client = self.clients.client_for(&reference.registry);
        debug!("Checking {} via {}", reference, client.family());

        let current_digest = match &reference.digest {
            Some(pinned) => {
                debug!("{} is pinned to {}", reference, short_digest(pinned));
                Some(pinned.clone())
            },
            None => {
                client
                    .digest_for_tag(&reference.repository, &reference.tag)
                    .await
            },
        };
        let current = DigestRecord::new(reference, current_digest);
        let reference = &current.reference;

        let latest_digest = if current.is_resolved() && !reference.is_floating() {
            client
                .digest_for_tag(&reference.repository, DEFAULT_TAG)
                .await
        } else {
            None
        };

        let mut latest_version_tag = None;
        let mut suggested_tag = None;
        if let (Some(current), Some(latest)) = (&current.digest, &latest_digest)
            && current != latest
            && let Some(tags) = client.list_tags(&reference.repository).await
        {
            latest_version_tag = select_latest_version(&tags);
            suggested_tag = suggest_upgrade(&reference.tag, &tags);
        }

        let status = self.evaluator.evaluate(
            reference,
            current.digest.as_deref(),
            latest_digest.as_deref(),
            latest_version_tag.as_deref(),
        );

        debug!(
            "{}: current={} latest={} -> {:?}",
            reference,
            current.digest.as_deref().map(short_digest).unwrap_or("-"),
            latest_digest.as_deref().map(short_digest).unwrap_or("-"),
            status
        );

        ImageCheck {
            current,
            latest_digest,
            latest_version_tag,
            suggested_tag,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryClient;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Stub {
        digests: HashMap<String, String>,
        tags: Option<Vec<String>>,
        calls: AtomicUsize,
    }

    impl Stub {
        fn with(mut self, image: &str, digest: &str) -> Self {
            self.digests.insert(image.to_string(), digest.to_string());
            self
        }
    }

    #[async_trait]
    impl RegistryClient for Stub {
        fn family(&self) -> &'static str {
            "dockerhub"
        }

        async fn digest_for_tag(&self, repository: &str, tag: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.digests.get(&format!("{}:{}", repository, tag)).cloned()
        }

        async fn list_tags(&self, _repository: &str) -> Option<Vec<String>> {
            self.tags.clone()
        }
    }

    fn scanner(stub: Arc<Stub>) -> Scanner {
        let dockerhub: Arc<dyn RegistryClient> = stub.clone();
        let ghcr: Arc<dyn RegistryClient> = stub.clone();
        let generic = stub.clone();
        let clients = RegistryClients::new(dockerhub, ghcr, move |_| {
            generic.clone() as Arc<dyn RegistryClient>
        });
        Scanner::new(clients, 2)
    }

    #[tokio::test]
    async fn test_update_available_with_version_tags() {
        let mut stub = Stub::default()
            .with("library/redis:7.2.1", "sha256:aaa")
            .with("library/redis:latest", "sha256:bbb");
        stub.tags = Some(
            ["7.2.1", "7.2.5", "7.4.0", "latest"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        );

        let check = scanner(Arc::new(stub)).check_image("redis:7.2.1").await;
        assert_eq!(
            check.status,
            UpdateStatus::UpdateAvailable {
                resolved_latest_tag: Some("7.4.0".to_string())
            }
        );
        assert_eq!(check.suggested_tag, Some("7.2.5".to_string()));
    }

    #[tokio::test]
    async fn test_floating_tag_skips_latest_lookup() {
        let stub = Arc::new(Stub::default().with("library/nginx:latest", "sha256:aaa"));
        let check = scanner(stub.clone()).check_image("nginx").await;

        assert_eq!(check.status, UpdateStatus::PinnedLatest);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_current_lookup_is_unknown() {
        let stub = Arc::new(Stub::default().with("library/nginx:latest", "sha256:aaa"));
        let check = scanner(stub).check_image("nginx:1.27").await;

        assert_eq!(check.status, UpdateStatus::Unknown);
        assert_eq!(check.latest_digest, None);
    }

    #[tokio::test]
    async fn test_outdated_digest_pin_is_an_update() {
        let stub = Arc::new(
            Stub::default()
                .with("library/nginx:1.27", "sha256:new")
                .with("library/nginx:latest", "sha256:new"),
        );
        let check = scanner(stub.clone())
            .check_image("nginx:1.27@sha256:old")
            .await;

        assert_eq!(check.current.digest.as_deref(), Some("sha256:old"));
        assert_eq!(
            check.status,
            UpdateStatus::UpdateAvailable {
                resolved_latest_tag: None
            }
        );
        // only `latest` is looked up, the tag digest is irrelevant
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_current_digest_pin_is_up_to_date() {
        let stub = Arc::new(Stub::default().with("library/nginx:latest", "sha256:new"));
        let check = scanner(stub).check_image("nginx:1.27@sha256:new").await;

        assert!(check.current.is_resolved());
        assert_eq!(check.status, UpdateStatus::UpToDate);
    }

    #[tokio::test]
    async fn test_shared_image_is_looked_up_once() {
        let stub = Arc::new(
            Stub::default()
                .with("library/postgres:16", "sha256:aaa")
                .with("library/postgres:latest", "sha256:aaa"),
        );
        let aggregator = scanner(stub.clone())
            .check_occurrences(vec![
                ImageOccurrence::new("a.yml", "postgres:16"),
                ImageOccurrence::new("b.yml", "postgres:16"),
                ImageOccurrence::new("a.yml", "postgres:16"),
            ])
            .await;

        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.counts().up_to_date, 2);
        // current + latest, once
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }
}
