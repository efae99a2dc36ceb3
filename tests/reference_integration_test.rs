// Integration tests for image reference parsing
//
// These tests cover the reference shapes found in real compose files and
// the properties every parsed reference must keep

use composewatch::Registry;
use composewatch::reference::parse;

#[test]
fn test_reference_shapes() {
    let cases = [
        ("nginx", Registry::DockerHub, "library/nginx", "latest"),
        ("nginx:1.27", Registry::DockerHub, "library/nginx", "1.27"),
        ("grafana/grafana:11.2.0", Registry::DockerHub, "grafana/grafana", "11.2.0"),
        ("ghcr.io/home-assistant/home-assistant:stable", Registry::Ghcr, "home-assistant/home-assistant", "stable"),
        ("lscr.io/linuxserver/plex", Registry::Generic("lscr.io".to_string()), "linuxserver/plex", "latest"),
        ("registry.lan:5000/tools/backup:2.1", Registry::Generic("registry.lan:5000".to_string()), "tools/backup", "2.1"),
        ("localhost/app:dev", Registry::Generic("localhost".to_string()), "app", "dev"),
    ];

    for (raw, registry, repository, tag) in cases {
        let reference = parse(raw);
        assert_eq!(reference.registry, registry, "registry of {}", raw);
        assert_eq!(reference.repository, repository, "repository of {}", raw);
        assert_eq!(reference.tag, tag, "tag of {}", raw);
        assert_eq!(reference.raw, raw);
    }
}

#[test]
fn test_tag_is_never_empty() {
    for raw in ["nginx:", "", "  ", ":", "org/app:", "\"\""] {
        assert!(!parse(raw).tag.is_empty(), "empty tag for {:?}", raw);
    }
}

#[test]
fn test_explicit_host_never_becomes_dockerhub_namespace() {
    let reference = parse("quay.io/prometheus/node-exporter:v1.8.2");
    assert_eq!(reference.registry_host.as_deref(), Some("quay.io"));
    assert!(!reference.repository.starts_with("library/"));
}

#[test]
fn test_digest_pin_is_kept_apart() {
    let reference =
        parse("postgres:16@sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef");
    assert_eq!(reference.repository, "library/postgres");
    assert_eq!(reference.tag, "16");
    assert!(reference.digest.as_deref().unwrap().starts_with("sha256:"));
}

#[test]
fn test_parse_is_deterministic() {
    for raw in ["nginx", "ghcr.io/o/r:v1", "registry.lan:5000/a/b:c"] {
        assert_eq!(parse(raw), parse(raw));
    }
}
