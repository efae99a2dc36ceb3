// Common test utilities for integration tests
//
// This module provides an in-memory registry and compose fixtures so the
// scanner can run end to end without network access

#![allow(dead_code)]

use async_trait::async_trait;
use composewatch::registry::{RegistryClient, RegistryClients};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Registry answering from fixed digest and tag tables
#[derive(Default)]
pub struct StubRegistry {
    family: &'static str,
    /// Keyed by `repository:tag`
    digests: HashMap<String, String>,
    tags: HashMap<String, Vec<String>>,
    lookups: AtomicUsize,
}

impl StubRegistry {
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            ..Default::default()
        }
    }

    pub fn digest(mut self, repository: &str, tag: &str, digest: &str) -> Self {
        self.digests
            .insert(format!("{}:{}", repository, tag), digest.to_string());
        self
    }

    pub fn tags(mut self, repository: &str, tags: &[&str]) -> Self {
        self.tags.insert(
            repository.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for StubRegistry {
    fn family(&self) -> &'static str {
        self.family
    }

    async fn digest_for_tag(&self, repository: &str, tag: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.digests
            .get(&format!("{}:{}", repository, tag))
            .cloned()
    }

    async fn list_tags(&self, repository: &str) -> Option<Vec<String>> {
        self.tags.get(repository).cloned()
    }
}

/// Clients where every generic host is unreachable
pub fn clients(dockerhub: Arc<StubRegistry>, ghcr: Arc<StubRegistry>) -> RegistryClients {
    let dockerhub: Arc<dyn RegistryClient> = dockerhub;
    let ghcr: Arc<dyn RegistryClient> = ghcr;
    RegistryClients::new(dockerhub, ghcr, |_| {
        Arc::new(StubRegistry::new("generic")) as Arc<dyn RegistryClient>
    })
}

/// Write `files` (relative path, content) under a fresh temporary directory
pub fn compose_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for (relative, content) in files {
        write_file(dir.path(), relative, content);
    }
    dir
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dir");
    }
    std::fs::write(path, content).expect("write fixture");
}

pub const MEDIA_COMPOSE: &str = r#"
services:
  sonarr:
    image: linuxserver/sonarr:4.0.8
  proxy:
    image: nginx
  cache:
    image: redis:7.2
"#;

pub const DB_COMPOSE: &str = r#"
services:
  db:
    image: "postgres:16.1"
  cache:
    image: redis:7.2
  exporter:
    image: ghcr.io/prometheus-community/postgres-exporter:v0.15.0
"#;
