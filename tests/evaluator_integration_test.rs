// Integration tests for update evaluation
//
// These tests run single images through the scanner against an in-memory
// registry and check the resulting classification

mod common;

use common::{StubRegistry, clients};
use composewatch::{Scanner, UpdateStatus};
use std::sync::Arc;

fn scanner(dockerhub: StubRegistry, ghcr: StubRegistry) -> Scanner {
    Scanner::new(clients(Arc::new(dockerhub), Arc::new(ghcr)), 4)
}

#[tokio::test]
async fn test_differing_digests_report_update_with_version() {
    let hub = StubRegistry::new("dockerhub")
        .digest("org/app", "2.1", "sha256:aaa")
        .digest("org/app", "latest", "sha256:bbb")
        .tags("org/app", &["2.0", "2.1", "2.2.0", "2.3.0", "latest"]);

    let check = scanner(hub, StubRegistry::new("ghcr"))
        .check_image("org/app:2.1")
        .await;

    assert_eq!(
        check.status,
        UpdateStatus::UpdateAvailable {
            resolved_latest_tag: Some("2.3.0".to_string())
        }
    );
}

#[tokio::test]
async fn test_matching_digests_are_up_to_date() {
    let hub = StubRegistry::new("dockerhub")
        .digest("library/postgres", "16.4", "sha256:aaa")
        .digest("library/postgres", "latest", "sha256:aaa");

    let check = scanner(hub, StubRegistry::new("ghcr"))
        .check_image("postgres:16.4")
        .await;

    assert_eq!(check.status, UpdateStatus::UpToDate);
    assert_eq!(check.latest_version_tag, None);
}

#[tokio::test]
async fn test_latest_tag_is_floating() {
    let hub = StubRegistry::new("dockerhub").digest("library/nginx", "latest", "sha256:aaa");

    let check = scanner(hub, StubRegistry::new("ghcr"))
        .check_image("nginx:latest")
        .await;

    assert_eq!(check.status, UpdateStatus::PinnedLatest);
}

#[tokio::test]
async fn test_failed_current_lookup_is_unknown() {
    let hub = StubRegistry::new("dockerhub").digest("library/nginx", "latest", "sha256:aaa");

    let check = scanner(hub, StubRegistry::new("ghcr"))
        .check_image("nginx:1.27")
        .await;

    assert_eq!(check.status, UpdateStatus::Unknown);
}

#[tokio::test]
async fn test_ghcr_without_latest_tag() {
    let ghcr = StubRegistry::new("ghcr").digest("org/tool", "v1.4.0", "sha256:aaa");

    let check = scanner(StubRegistry::new("dockerhub"), ghcr)
        .check_image("ghcr.io/org/tool:v1.4.0")
        .await;

    assert_eq!(check.status, UpdateStatus::NoLatestTag);
}

#[tokio::test]
async fn test_ghcr_update_has_no_resolved_version() {
    let ghcr = StubRegistry::new("ghcr")
        .digest("org/tool", "v1.4.0", "sha256:aaa")
        .digest("org/tool", "latest", "sha256:bbb");

    let check = scanner(StubRegistry::new("dockerhub"), ghcr)
        .check_image("ghcr.io/org/tool:v1.4.0")
        .await;

    assert_eq!(
        check.status,
        UpdateStatus::UpdateAvailable {
            resolved_latest_tag: None
        }
    );
}

#[tokio::test]
async fn test_unreachable_generic_registry_is_unknown() {
    let check = scanner(StubRegistry::new("dockerhub"), StubRegistry::new("ghcr"))
        .check_image("registry.lan:5000/tools/backup:2.1")
        .await;

    assert_eq!(check.status, UpdateStatus::Unknown);
}
