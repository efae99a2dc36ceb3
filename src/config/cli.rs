use super::{ComposewatchConfig, ConfigError, LogFormat, OutputFormat};
use clap::Parser;
use std::path::PathBuf;

/// Find the images used by Docker Compose stacks and check their registries for updates
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "composewatch", version, about)]
pub struct Cli {
    /// Directory to scan for compose manifests
    #[arg(short, long, env = "COMPOSEWATCH_ROOT")]
    pub root: Option<PathBuf>,

    /// Glob pattern under the root; repeat for several patterns
    #[arg(short, long = "glob", env = "COMPOSEWATCH_GLOB", value_delimiter = ',')]
    pub globs: Vec<String>,

    /// Per-request registry timeout in seconds
    #[arg(short, long, env = "COMPOSEWATCH_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Maximum number of images checked concurrently
    #[arg(short, long, env = "COMPOSEWATCH_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum, env = "COMPOSEWATCH_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Log format on stderr
    #[arg(long, value_enum, env = "COMPOSEWATCH_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Debug logging for composewatch
    #[arg(short, long, env = "COMPOSEWATCH_VERBOSE")]
    pub verbose: bool,

    /// YAML configuration file
    #[arg(long, env = "COMPOSEWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write Prometheus metrics to this file after the scan
    #[arg(long, env = "COMPOSEWATCH_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

/// Exit status for invalid flags or configuration
pub const EXIT_CONFIG_ERROR: u8 = 1;

impl Cli {
    /// Exit status for a failed parse, or `None` when clap printed help or the
    /// version and the process should exit the way clap does
    pub fn usage_exit_code(err: &clap::Error) -> Option<u8> {
        err.use_stderr().then_some(EXIT_CONFIG_ERROR)
    }

    /// Resolve the effective configuration: flags and env over file over defaults
    pub fn into_config(self) -> Result<ComposewatchConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ComposewatchConfig::from_file(path)?,
            None => ComposewatchConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(self, config: &mut ComposewatchConfig) {
        if let Some(root) = self.root {
            config.scan.root = root;
        }
        if !self.globs.is_empty() {
            config.scan.globs = self.globs;
        }
        if let Some(timeout) = self.timeout {
            config.registry.timeout_seconds = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.scan.concurrency = concurrency;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(log_format) = self.log_format {
            config.output.log_format = log_format;
        }
        if self.verbose {
            config.output.verbose = true;
        }
        if let Some(metrics_file) = self.metrics_file {
            config.output.metrics_file = Some(metrics_file);
        }
    }
}
