use super::ScanError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `image:` lines, used when a manifest is not valid YAML
static IMAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*image\s*:\s*(.+?)\s*$").expect("valid image line regex")
});

/// A compose manifest and the images it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub path: PathBuf,
    /// Path relative to the scan root, used as the report key
    pub display_path: String,
    /// Raw image strings in file order, without duplicates
    pub images: Vec<String>,
}

impl Manifest {
    pub fn load(root: &Path, path: &Path) -> Result<Self, ScanError> {
        let content = std::fs::read(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // Manifests occasionally carry stray bytes; replace them instead of failing
        let content = String::from_utf8_lossy(&content);

        Ok(Self {
            path: path.to_path_buf(),
            display_path: display_path(root, path),
            images: extract_images(&content),
        })
    }
}

/// Find compose manifests under `root` matching any of `patterns`.
///
/// Returns regular files only, sorted and without duplicates.
pub fn find_manifests(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, ScanError> {
    let mut found = Vec::new();
    // The root is a literal directory, only the patterns may carry wildcards
    let root_pattern = PathBuf::from(glob::Pattern::escape(&root.to_string_lossy()));

    for pattern in patterns {
        let full = root_pattern.join(pattern);
        let full = full.to_string_lossy();
        debug!("Globbing {}", full);

        let paths = glob::glob(&full).map_err(|source| ScanError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => found.push(path),
                Ok(_) => {},
                Err(e) => warn!("Skipping unreadable path {}: {}", e.path().display(), e),
            }
        }
    }

    found.sort();
    found.dedup();
    Ok(found)
}

/// Extract image strings from compose content.
///
/// Reads `services.*.image` from every YAML document. Content that does not
/// parse, or parses without any service image, falls back to scanning
/// `image:` lines.
pub fn extract_images(content: &str) -> Vec<String> {
    let images = match images_from_yaml(content) {
        Ok(images) if !images.is_empty() => images,
        Ok(_) => images_from_lines(content),
        Err(e) => {
            debug!("Manifest is not valid YAML ({}), scanning image lines", e);
            images_from_lines(content)
        },
    };
    dedup_in_order(images)
}

fn images_from_yaml(content: &str) -> Result<Vec<String>, serde_yaml::Error> {
    let mut images = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        let Some(services) = value.get("services").and_then(|s| s.as_mapping()) else {
            continue;
        };

        for service in services.values() {
            if let Some(image) = service.get("image").and_then(|i| i.as_str()) {
                let image = image.trim();
                if !image.is_empty() {
                    images.push(image.to_string());
                }
            }
        }
    }

    Ok(images)
}

fn images_from_lines(content: &str) -> Vec<String> {
    IMAGE_LINE
        .captures_iter(content)
        .filter_map(|caps| {
            let value = caps.get(1)?.as_str();
            // Trailing comment: "image: nginx:1.27  # pinned"
            let value = match value.find(" #") {
                Some(index) => &value[..index],
                None => value,
            };
            let value = value.trim().trim_matches(['"', '\'']).trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect()
}

fn dedup_in_order(images: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    images
        .into_iter()
        .filter(|image| seen.insert(image.clone()))
        .collect()
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
