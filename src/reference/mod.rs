use crate::models::{DEFAULT_TAG, ImageReference, Registry};
use std::convert::Infallible;
use std::str::FromStr;
use tracing::debug;

/// Parse a raw image string into an [`ImageReference`].
///
/// Accepts `[host/]repository[:tag][@digest]` in any of the shapes found in
/// compose files. Parsing never fails: anything that cannot be decomposed
/// ends up as a Docker Hub reference with the raw string as repository and
/// `latest` as tag.
pub fn parse(raw: &str) -> ImageReference {
    let cleaned = raw.trim().trim_matches(['"', '\'']).trim();

    // Drop a digest pin before looking for the tag, it contains a ':' itself
    let (name, digest) = match cleaned.split_once('@') {
        Some((name, digest)) if !digest.is_empty() => (name, Some(digest.to_string())),
        Some((name, _)) => (name, None),
        None => (cleaned, None),
    };

    let (registry_host, remainder) = split_registry_host(name);

    let (repository, tag) = match remainder.rsplit_once(':') {
        Some((repository, tag)) if !tag.is_empty() => (repository, tag),
        Some((repository, _)) => (repository, DEFAULT_TAG),
        None => (remainder, DEFAULT_TAG),
    };

    if repository.is_empty() {
        debug!("Could not decompose image reference '{}'", raw);
        return ImageReference {
            raw: raw.to_string(),
            registry: Registry::DockerHub,
            registry_host: None,
            repository: cleaned.to_string(),
            tag: DEFAULT_TAG.to_string(),
            digest: None,
        };
    }

    let registry = match registry_host {
        Some(host) => Registry::from_host(host),
        None => Registry::DockerHub,
    };

    // Official images live under the implicit "library" namespace
    let repository = if registry == Registry::DockerHub && !repository.contains('/') {
        format!("library/{}", repository)
    } else {
        repository.to_string()
    };

    ImageReference {
        raw: raw.to_string(),
        registry,
        registry_host: registry_host.map(String::from),
        repository,
        tag: tag.to_string(),
        digest,
    }
}

/// Whether the first path segment of a reference names a registry host.
///
/// `org/image` must not be read as host `org`, so only segments that look
/// like a hostname (a dot or a port) or are literally `localhost` qualify.
pub fn is_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

fn split_registry_host(name: &str) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((first, rest)) if is_registry_host(first) => (Some(first), rest),
        _ => (None, name),
    }
}

impl FromStr for ImageReference {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse(s))
    }
}

impl From<&str> for ImageReference {
    fn from(raw: &str) -> Self {
        parse(raw)
    }
}
