use serde::{Deserialize, Serialize};

use super::image::ImageReference;

/// Update classification for one image in one manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateStatus {
    /// Current tag digest matches the `latest` digest
    UpToDate,
    /// Digests differ. Carries the newest version tag when the registry
    /// family can resolve one (Docker Hub only).
    UpdateAvailable {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolved_latest_tag: Option<String>,
    },
    /// The reference uses `latest` or `stable`
    PinnedLatest,
    /// The repository has no resolvable `latest` tag
    NoLatestTag,
    /// The current tag could not be looked up
    Unknown,
}

impl UpdateStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            UpdateStatus::UpToDate => StatusKind::UpToDate,
            UpdateStatus::UpdateAvailable { .. } => StatusKind::UpdateAvailable,
            UpdateStatus::PinnedLatest => StatusKind::PinnedLatest,
            UpdateStatus::NoLatestTag => StatusKind::NoLatestTag,
            UpdateStatus::Unknown => StatusKind::Unknown,
        }
    }
}

/// Fieldless mirror of [`UpdateStatus`] used for counting and labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    UpToDate,
    UpdateAvailable,
    PinnedLatest,
    NoLatestTag,
    Unknown,
}

impl StatusKind {
    pub const ALL: [StatusKind; 5] = [
        StatusKind::UpToDate,
        StatusKind::UpdateAvailable,
        StatusKind::PinnedLatest,
        StatusKind::NoLatestTag,
        StatusKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpToDate => "up_to_date",
            Self::UpdateAvailable => "update_available",
            Self::PinnedLatest => "pinned_latest",
            Self::NoLatestTag => "no_latest_tag",
            Self::Unknown => "unknown",
        }
    }

    /// Short label for the text report
    pub fn label(&self) -> &'static str {
        match self {
            Self::UpToDate => "CURRENT",
            Self::UpdateAvailable => "UPDATE",
            Self::PinnedLatest => "FLOATING",
            Self::NoLatestTag => "NO-LATEST",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Totals per status across a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub up_to_date: usize,
    pub update_available: usize,
    pub pinned_latest: usize,
    pub no_latest_tag: usize,
    pub unknown: usize,
}

impl StatusCounts {
    pub fn record(&mut self, kind: StatusKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: StatusKind) -> usize {
        match kind {
            StatusKind::UpToDate => self.up_to_date,
            StatusKind::UpdateAvailable => self.update_available,
            StatusKind::PinnedLatest => self.pinned_latest,
            StatusKind::NoLatestTag => self.no_latest_tag,
            StatusKind::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        StatusKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }

    fn slot(&mut self, kind: StatusKind) -> &mut usize {
        match kind {
            StatusKind::UpToDate => &mut self.up_to_date,
            StatusKind::UpdateAvailable => &mut self.update_available,
            StatusKind::PinnedLatest => &mut self.pinned_latest,
            StatusKind::NoLatestTag => &mut self.no_latest_tag,
            StatusKind::Unknown => &mut self.unknown,
        }
    }
}

/// One evaluated image occurrence in one manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub source_file: String,
    pub raw_image: String,
    pub reference: ImageReference,
    #[serde(flatten)]
    pub status: UpdateStatus,
    /// Newest tag on the same release line as the current one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_tag: Option<String>,
}
