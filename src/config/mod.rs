mod cli;

pub use cli::{Cli, EXIT_CONFIG_ERROR};

use crate::registry::DockerHubEndpoints;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GLOB: &str = "**/docker-compose*.yml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY: usize = 4;
const USER_AGENT: &str = concat!("composewatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Composewatch configuration, loaded from an optional YAML file and
/// overridden by command-line flags and `COMPOSEWATCH_*` environment variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposewatchConfig {
    pub scan: ScanConfig,
    pub registry: RegistryConfig,
    pub output: OutputConfig,
    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Directory searched for compose manifests
    pub root: PathBuf,
    /// Glob patterns relative to `root`
    pub globs: Vec<String>,
    /// Maximum number of images looked up concurrently
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            globs: vec![DEFAULT_GLOB.to_string()],
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub dockerhub: DockerHubEndpoints,
    /// `host[:port]` registries reached over plain HTTP
    pub insecure_registries: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            user_agent: USER_AGENT.to_string(),
            dockerhub: DockerHubEndpoints::default(),
            insecure_registries: Vec::new(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Grouped, color-coded table
    #[default]
    Text,
    /// Machine-readable report
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbose: bool,
    pub log_format: LogFormat,
    /// Write Prometheus metrics here after the scan
    pub metrics_file: Option<PathBuf>,
}

impl ComposewatchConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is a valid, all-defaults configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.globs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one manifest glob is required".to_string(),
            ));
        }
        if self.scan.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.registry.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "registry timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}
