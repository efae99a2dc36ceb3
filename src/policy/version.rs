use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use std::cmp::Ordering;
use tracing::debug;

use crate::models::is_floating_tag;

/// `v1.2`, `1.25.3`, `2.0.1-alpine`: a major and minor number up front
static CLEAN_VERSION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?[0-9]+\.[0-9]+").expect("valid version prefix regex"));

/// Pre-release, architecture and variant markers that disqualify a tag
static EXCLUDED_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(alpha|beta|-rc|rc[0-9]+|dev|nightly|amd64|arm32|arm64|armv[0-9]|armel|armhf|aarch64|x86_64|s390x|ppc|i386|ubuntu|debug|rootless|fips|ubi|enterprise)",
    )
    .expect("valid exclusion regex")
});

/// `v?MAJOR(.MINOR)?(.PATCH)?` with an optional `-suffix`
static SEMVERISH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?([0-9]+)(?:\.([0-9]+))?(?:\.([0-9]+))?$").expect("valid semver-ish regex")
});

/// Whether a tag looks like a release version worth offering as "latest".
pub fn is_clean_version_tag(tag: &str) -> bool {
    CLEAN_VERSION_PREFIX.is_match(tag) && !EXCLUDED_MARKERS.is_match(tag)
}

/// Ordering key for a version-shaped tag.
///
/// The first three numeric segments become a [`semver::Version`]; anything
/// beyond (e.g. the `4` in `1.2.3.4`) is compared afterwards, and a trailing
/// suffix only breaks ties, with the bare version ranking highest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagVersion {
    pub version: Version,
    pub extra: Vec<u64>,
    pub suffix: Option<String>,
}

impl TagVersion {
    pub fn parse(tag: &str) -> Option<Self> {
        let body = tag.strip_prefix('v').unwrap_or(tag);
        let numeric_end = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let (numbers, rest) = body.split_at(numeric_end);

        let segments = numbers
            .trim_end_matches('.')
            .split('.')
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .ok()?;

        let version = Version::new(
            segments.first().copied()?,
            segments.get(1).copied().unwrap_or(0),
            segments.get(2).copied().unwrap_or(0),
        );
        let extra = segments.iter().skip(3).copied().collect();
        let suffix = Some(rest.trim_start_matches(['-', '_', '+']))
            .filter(|s| !s.is_empty())
            .map(String::from);

        Some(Self {
            version,
            extra,
            suffix,
        })
    }
}

impl Ord for TagVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.extra.cmp(&other.extra))
            .then_with(|| match (&self.suffix, &other.suffix) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for TagVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pick the highest clean version tag using numeric, not lexical, ordering.
pub fn select_latest_version<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    let best = tags
        .iter()
        .map(AsRef::as_ref)
        .filter(|tag| is_clean_version_tag(tag))
        .filter_map(|tag| TagVersion::parse(tag).map(|version| (version, tag)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag.to_string());

    debug!(
        "Selected {:?} as latest version out of {} tags",
        best,
        tags.len()
    );
    best
}

/// A tag split into its `v?MAJOR(.MINOR)?(.PATCH)?` base and optional suffix
#[derive(Debug, Clone, PartialEq, Eq)]
struct SemverishTag {
    major: u64,
    minor: Option<u64>,
    patch: Option<u64>,
    suffix: Option<String>,
}

impl SemverishTag {
    fn parse(tag: &str) -> Option<Self> {
        let (base, suffix) = match tag.split_once('-') {
            Some((base, suffix)) => (base, Some(suffix.to_string())),
            None => (tag, None),
        };
        let captures = SEMVERISH.captures(base)?;
        let number = |i: usize| captures.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

        Some(Self {
            major: number(1)?,
            minor: number(2),
            patch: number(3),
            suffix,
        })
    }

    fn sort_key(&self) -> (u64, u64, u64) {
        (
            self.major,
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        )
    }
}

/// Suggest the newest tag on the same release line as `current`.
///
/// The suffix of the current tag is kept (`1.25-alpine` only moves to other
/// `-alpine` tags). Tags sharing major and minor are preferred, then tags
/// sharing only the major. Only a strictly newer tag is suggested; floating
/// and non-version tags never get a suggestion.
pub fn suggest_upgrade<S: AsRef<str>>(current: &str, tags: &[S]) -> Option<String> {
    if is_floating_tag(current) {
        return None;
    }
    let current_version = SemverishTag::parse(current)?;

    let candidates: Vec<(&str, SemverishTag)> = tags
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|tag| SemverishTag::parse(tag).map(|version| (tag, version)))
        .filter(|(_, version)| version.suffix == current_version.suffix)
        .filter(|(_, version)| version.major == current_version.major)
        .collect();

    let same_line: Vec<&(&str, SemverishTag)> = match current_version.minor {
        Some(minor) => candidates
            .iter()
            .filter(|(_, version)| version.minor == Some(minor))
            .collect(),
        None => candidates.iter().collect(),
    };

    let pool = if same_line.is_empty() {
        candidates.iter().collect()
    } else {
        same_line
    };

    let (best_tag, best_version) = pool
        .into_iter()
        .max_by_key(|(_, version)| version.sort_key())?;

    if best_version.sort_key() <= current_version.sort_key() {
        return None;
    }
    Some(best_tag.to_string())
}
