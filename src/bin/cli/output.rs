//! Output formatting for CLI operations.

use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use zipbatch::storage::Lifetime;
use zipbatch::{AppendReport, ArtifactReference, SkipReason, StatusMessage};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the result of a zip run
    fn format_zip_result(&self, artifact: &ArtifactReference, report: &AppendReport) -> String;

    /// Formats the result of a remote import
    fn format_import_result(&self, artifact: &ArtifactReference) -> String;

    /// Formats the names removed by an expiry pass
    fn format_expire_result(&self, removed: &[String]) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_zip_result(&self, artifact: &ArtifactReference, report: &AppendReport) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Archived {} files into {} ({})\n",
            artifact.entry_count,
            artifact.file_name,
            humanize_bytes(artifact.size)
        ));

        if !report.renamed.is_empty() {
            output.push_str(&format!("Renamed {} files:\n", report.renamed.len()));
            for (requested, stored) in &report.renamed {
                output.push_str(&format!("  {} -> {}\n", requested, stored));
            }
        }

        if !report.skipped.is_empty() {
            output.push_str(&format!("Skipped {} files:\n", report.skipped.len()));
            for skipped in &report.skipped {
                output.push_str(&format!(
                    "  {} ({})\n",
                    skipped.entry.source_path().display(),
                    describe_reason(&skipped.reason)
                ));
            }
        }

        output.push_str(&format!("{}\n", StatusMessage::download_ready(artifact)));
        output
    }

    fn format_import_result(&self, artifact: &ArtifactReference) -> String {
        format!(
            "Imported {} ({})\n  {}\n",
            artifact.file_name,
            humanize_bytes(artifact.size),
            artifact.link()
        )
    }

    fn format_expire_result(&self, removed: &[String]) -> String {
        if removed.is_empty() {
            return "No expired artifacts\n".to_string();
        }
        let mut output = format!("Removed {} expired artifacts:\n", removed.len());
        for name in removed {
            output.push_str(&format!("  {}\n", name));
        }
        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl JsonFormatter {
    fn artifact_json(artifact: &ArtifactReference) -> serde_json::Value {
        json!({
            "location": artifact.location,
            "file_name": artifact.file_name,
            "size": artifact.size,
            "entry_count": artifact.entry_count,
            "created": unix_secs(artifact.created),
            "lifetime": match artifact.lifetime {
                Lifetime::Temporary => "temporary",
                Lifetime::Permanent => "permanent",
            },
            "url": artifact.url,
        })
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_zip_result(&self, artifact: &ArtifactReference, report: &AppendReport) -> String {
        let obj = json!({
            "artifact": Self::artifact_json(artifact),
            "appended": report.appended_count(),
            "renamed": report.renamed.iter().map(|(from, to)| json!({"from": from, "to": to})).collect::<Vec<_>>(),
            "skipped": report.skipped.iter().map(|s| json!({
                "path": s.entry.source_path().display().to_string(),
                "name": s.entry.stored_name().as_str(),
                "reason": describe_reason(&s.reason),
            })).collect::<Vec<_>>(),
            "message": StatusMessage::download_ready(artifact).to_html(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_import_result(&self, artifact: &ArtifactReference) -> String {
        serde_json::to_string_pretty(&Self::artifact_json(artifact))
            .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_expire_result(&self, removed: &[String]) -> String {
        serde_json::to_string_pretty(&json!({ "removed": removed }))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn describe_reason(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Missing => "not found".to_string(),
        SkipReason::Unreadable(msg) => format!("unreadable: {}", msg),
        SkipReason::Duplicate => "duplicate name".to_string(),
    }
}

fn unix_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
