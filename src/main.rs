use anyhow::{Context, Result};
use clap::Parser;
use composewatch::config::{Cli, EXIT_CONFIG_ERROR, LogFormat, OutputConfig, OutputFormat};
use composewatch::metrics;
use composewatch::registry::RegistryClients;
use composewatch::report::{self, ScanReport};
use composewatch::scanner::{ScanError, Scanner};
use std::io::Write;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Nothing to check: no manifests, or manifests without images
const EXIT_NOTHING_TO_SCAN: u8 = 2;

fn init_tracing(output: &OutputConfig) {
    let default_filter = if output.verbose {
        "composewatch=debug"
    } else {
        "composewatch=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // stdout carries the report, logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    match output.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_report(report: &ScanReport, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let written = match format {
        OutputFormat::Text => report::render_text(report, &mut out, report::use_color()),
        OutputFormat::Json => report::render_json(report, &mut out),
    };
    written
        .and_then(|_| out.flush())
        .context("Failed to write report")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match Cli::usage_exit_code(&e) {
            Some(code) => {
                // Printing can only fail if stderr is gone
                let _ = e.print();
                return Ok(ExitCode::from(code));
            },
            None => e.exit(),
        },
    };

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG_ERROR));
        },
    };
    init_tracing(&config.output);
    metrics::register_metrics();

    match &config.source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => debug!("No configuration file, using flags and defaults"),
    }
    debug!("Effective configuration: {:?}", config);

    info!(
        "Starting composewatch {} in {}",
        env!("CARGO_PKG_VERSION"),
        config.scan.root.display()
    );

    let clients = RegistryClients::from_config(&config.registry)
        .context("Failed to create registry HTTP client")?;
    let scanner = Scanner::new(clients, config.scan.concurrency);

    let report = match scanner.scan(&config.scan.root, &config.scan.globs).await {
        Ok(report) => report,
        Err(e @ (ScanError::NoManifestsFound { .. } | ScanError::NoImagesFound { .. })) => {
            error!("{}", e);
            return Ok(ExitCode::from(EXIT_NOTHING_TO_SCAN));
        },
        Err(e) => return Err(e.into()),
    };

    print_report(&report, config.output.format)?;

    metrics::record_scan_results(&report.counts);
    if let Some(path) = &config.output.metrics_file {
        metrics::write_textfile(path)?;
    }

    Ok(ExitCode::SUCCESS)
}
