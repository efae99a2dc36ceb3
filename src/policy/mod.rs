pub mod version;

use crate::models::{ImageReference, UpdateStatus};
use tracing::debug;

pub use version::{is_clean_version_tag, select_latest_version, suggest_upgrade, TagVersion};

/// Classifies an image's update status from its digest lookups.
///
/// Rules are applied in order and the first match wins:
/// 1. current digest unknown: `Unknown` (nothing can be said about what is deployed)
/// 2. tag is `latest`/`stable`: `PinnedLatest`
/// 3. `latest` digest unknown: `NoLatestTag`
/// 4. digests equal: `UpToDate`
/// 5. otherwise: `UpdateAvailable`, carrying the resolved version tag if any
pub struct UpdateEvaluator;

impl UpdateEvaluator {
    pub fn evaluate(
        &self,
        reference: &ImageReference,
        current_digest: Option<&str>,
        latest_digest: Option<&str>,
        latest_version_tag: Option<&str>,
    ) -> UpdateStatus {
        let Some(current) = current_digest else {
            debug!("No current digest for {}, status unknown", reference);
            return UpdateStatus::Unknown;
        };

        if reference.is_floating() {
            debug!("{} uses floating tag '{}'", reference, reference.tag);
            return UpdateStatus::PinnedLatest;
        }

        let Some(latest) = latest_digest else {
            debug!("No 'latest' digest for {}", reference.repository);
            return UpdateStatus::NoLatestTag;
        };

        if current == latest {
            return UpdateStatus::UpToDate;
        }

        debug!(
            "Digest mismatch for {}: {} vs latest {}",
            reference,
            short_digest(current),
            short_digest(latest)
        );

        UpdateStatus::UpdateAvailable {
            resolved_latest_tag: latest_version_tag.map(String::from),
        }
    }
}

/// First 12 hex characters of a digest, for logs
pub fn short_digest(digest: &str) -> &str {
    let hex = digest.split_once(':').map_or(digest, |(_, hex)| hex);
    hex.get(..12).unwrap_or(hex)
}
