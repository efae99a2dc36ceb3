use super::ScanReport;
use crate::models::{ScanEntry, StatusKind, UpdateStatus};
use std::io::{self, IsTerminal, Write};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Colors only on an interactive stdout, and never when `NO_COLOR` is set
pub fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
}

fn status_color(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::UpToDate => "\x1b[32m",
        StatusKind::UpdateAvailable => "\x1b[31m",
        StatusKind::PinnedLatest | StatusKind::NoLatestTag => "\x1b[33m",
        StatusKind::Unknown => "\x1b[35m",
    }
}

fn note(entry: &ScanEntry) -> String {
    match &entry.status {
        UpdateStatus::UpToDate => "matches latest".to_string(),
        UpdateStatus::UpdateAvailable {
            resolved_latest_tag: Some(tag),
        } => format!("latest is {}", tag),
        UpdateStatus::UpdateAvailable {
            resolved_latest_tag: None,
        } => "digest differs from latest".to_string(),
        UpdateStatus::PinnedLatest => format!("floating tag '{}'", entry.reference.tag),
        UpdateStatus::NoLatestTag => "no 'latest' tag to compare".to_string(),
        UpdateStatus::Unknown => "registry lookup failed".to_string(),
    }
}

fn newer_tag(entry: &ScanEntry) -> &str {
    match (&entry.suggested_tag, &entry.status) {
        (Some(tag), _) => tag.as_str(),
        (
            None,
            UpdateStatus::UpdateAvailable {
                resolved_latest_tag: Some(tag),
            },
        ) => tag.as_str(),
        _ => "-",
    }
}

/// Human-readable report grouped by manifest
pub fn render_text<W: Write>(report: &ScanReport, out: &mut W, color: bool) -> io::Result<()> {
    let (bold, reset) = if color { (BOLD, RESET) } else { ("", "") };

    writeln!(out, "Root: {}", report.root)?;
    writeln!(
        out,
        "Compose files: {}  |  Unique images: {}",
        report.manifests, report.unique_images
    )?;

    let image_width = report
        .entries()
        .map(|e| e.raw_image.len())
        .max()
        .unwrap_or(0)
        .max("IMAGE".len());

    for group in &report.files {
        writeln!(out)?;
        writeln!(out, "{}== {}{}", bold, group.source_file, reset)?;
        writeln!(
            out,
            "{:<10} {:<10} {:<iw$} {:<16} NOTE",
            "STATUS",
            "REGISTRY",
            "IMAGE",
            "NEWER",
            iw = image_width
        )?;

        for entry in &group.entries {
            let kind = entry.status.kind();
            // Pad before coloring so escape codes do not skew the columns
            let label = format!("{:<10}", kind.label());
            let label = if color {
                format!("{}{}{}", status_color(kind), label, RESET)
            } else {
                label
            };

            writeln!(
                out,
                "{} {:<10} {:<iw$} {:<16} {}",
                label,
                entry.reference.registry.family(),
                entry.raw_image,
                newer_tag(entry),
                note(entry),
                iw = image_width
            )?;
        }
    }

    let counts = &report.counts;
    writeln!(out)?;
    writeln!(
        out,
        "{}Summary:{} {} checked, {} up to date, {} with updates, {} floating, {} without latest, {} unknown",
        bold,
        reset,
        counts.total(),
        counts.up_to_date,
        counts.update_available,
        counts.pinned_latest,
        counts.no_latest_tag,
        counts.unknown
    )?;
    Ok(())
}

pub fn render_json<W: Write>(report: &ScanReport, out: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}
