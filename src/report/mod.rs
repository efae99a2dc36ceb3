mod render;

pub use render::{render_json, render_text, use_color};

use crate::models::{ScanEntry, StatusCounts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Entries of one manifest, in scan order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGroup {
    pub source_file: String,
    pub entries: Vec<ScanEntry>,
}

/// Final, grouped result of a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub root: String,
    pub manifests: usize,
    pub unique_images: usize,
    pub files: Vec<FileGroup>,
    pub counts: StatusCounts,
}

impl ScanReport {
    pub fn entries(&self) -> impl Iterator<Item = &ScanEntry> {
        self.files.iter().flat_map(|group| group.entries.iter())
    }

    pub fn total(&self) -> usize {
        self.counts.total()
    }
}

/// Collects scan entries grouped by source file.
///
/// Files keep their first-seen order and entries keep scan order within a
/// file. An entry whose `(source_file, raw_image)` pair was already recorded
/// is ignored.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    seen: HashSet<(String, String)>,
    file_index: HashMap<String, usize>,
    files: Vec<FileGroup>,
    counts: StatusCounts,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry. Returns `false` if the pair was already present.
    pub fn record(&mut self, entry: ScanEntry) -> bool {
        let key = (entry.source_file.clone(), entry.raw_image.clone());
        if !self.seen.insert(key) {
            debug!(
                "Skipping duplicate {} in {}",
                entry.raw_image, entry.source_file
            );
            return false;
        }

        self.counts.record(entry.status.kind());

        let index = match self.file_index.get(&entry.source_file) {
            Some(index) => *index,
            None => {
                self.files.push(FileGroup {
                    source_file: entry.source_file.clone(),
                    entries: Vec::new(),
                });
                let index = self.files.len() - 1;
                self.file_index.insert(entry.source_file.clone(), index);
                index
            },
        };
        self.files[index].entries.push(entry);
        true
    }

    pub fn contains(&self, source_file: &str, raw_image: &str) -> bool {
        self.seen
            .contains(&(source_file.to_string(), raw_image.to_string()))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    pub fn finish(self, root: impl Into<String>, manifests: usize) -> ScanReport {
        let unique_images = self
            .files
            .iter()
            .flat_map(|group| group.entries.iter().map(|e| e.raw_image.as_str()))
            .collect::<HashSet<_>>()
            .len();

        ScanReport {
            generated_at: Utc::now(),
            root: root.into(),
            manifests,
            unique_images,
            files: self.files,
            counts: self.counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpdateStatus;
    use crate::reference::parse;

    fn entry(file: &str, raw: &str, status: UpdateStatus) -> ScanEntry {
        ScanEntry {
            source_file: file.to_string(),
            raw_image: raw.to_string(),
            reference: parse(raw),
            status,
            suggested_tag: None,
        }
    }

    #[test]
    fn test_duplicate_pair_is_recorded_once() {
        let mut aggregator = ReportAggregator::new();

        assert!(aggregator.record(entry("a.yml", "nginx:1.27", UpdateStatus::UpToDate)));
        assert!(!aggregator.record(entry("a.yml", "nginx:1.27", UpdateStatus::UpToDate)));

        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.counts().up_to_date, 1);
        assert!(aggregator.contains("a.yml", "nginx:1.27"));
    }

    #[test]
    fn test_same_image_in_two_files_is_kept() {
        let mut aggregator = ReportAggregator::new();
        aggregator.record(entry("a.yml", "redis:7", UpdateStatus::UpToDate));
        aggregator.record(entry("b.yml", "redis:7", UpdateStatus::UpToDate));

        let report = aggregator.finish("/srv", 2);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.total(), 2);
        assert_eq!(report.unique_images, 1);
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let mut aggregator = ReportAggregator::new();
        aggregator.record(entry("b.yml", "redis:7", UpdateStatus::UpToDate));
        aggregator.record(entry("a.yml", "nginx", UpdateStatus::PinnedLatest));
        aggregator.record(entry("b.yml", "postgres:16", UpdateStatus::Unknown));

        let report = aggregator.finish("/srv", 2);
        let files: Vec<&str> = report
            .files
            .iter()
            .map(|g| g.source_file.as_str())
            .collect();
        assert_eq!(files, vec!["b.yml", "a.yml"]);

        let images: Vec<&str> = report.files[0]
            .entries
            .iter()
            .map(|e| e.raw_image.as_str())
            .collect();
        assert_eq!(images, vec!["redis:7", "postgres:16"]);
    }

    #[test]
    fn test_counts_per_status() {
        let mut aggregator = ReportAggregator::new();
        aggregator.record(entry("a.yml", "nginx", UpdateStatus::PinnedLatest));
        aggregator.record(entry(
            "a.yml",
            "redis:7.2",
            UpdateStatus::UpdateAvailable {
                resolved_latest_tag: Some("7.4.1".to_string()),
            },
        ));
        aggregator.record(entry("a.yml", "ghcr.io/o/r:v1", UpdateStatus::NoLatestTag));
        aggregator.record(entry("a.yml", "postgres:16", UpdateStatus::Unknown));

        let counts = aggregator.counts();
        assert_eq!(counts.pinned_latest, 1);
        assert_eq!(counts.update_available, 1);
        assert_eq!(counts.no_latest_tag, 1);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.up_to_date, 0);
    }

    #[test]
    fn test_empty_aggregator() {
        let aggregator = ReportAggregator::new();
        assert!(aggregator.is_empty());

        let report = aggregator.finish(".", 0);
        assert!(report.files.is_empty());
        assert_eq!(report.entries().count(), 0);
    }
}
