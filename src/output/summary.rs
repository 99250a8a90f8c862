//! Markdown summary generation
//!
//! This module generates the human-readable `ARCHIVE_SUMMARY.md` written at the
//! output root after a run: run metadata, totals, a per-space table and the
//! subtrees that failed.

use crate::output::OutputResult;
use crate::state::RunReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// File name of the summary report inside the output root
pub const SUMMARY_FILE_NAME: &str = "ARCHIVE_SUMMARY.md";

/// Writes the markdown summary of a run
///
/// # Arguments
///
/// * `report` - The finished run report
/// * `config_hash` - Hash of the configuration file, when one was loaded
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn write_archive_summary(
    report: &RunReport,
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_archive_summary(report, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_archive_summary(report: &RunReport, config_hash: Option<&str>) -> String {
    let mut md = String::new();
    let totals = report.totals();

    md.push_str("# Sumi-Archive Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Workspace**: {}\n", report.workspace_id));
    if let Some(scope) = &report.scope_id {
        md.push_str(&format!("- **Scope**: {}\n", scope));
    }
    md.push_str(&format!("- **Output**: {}\n", report.output_dir));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Totals
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Spaces**: {}\n", report.subtrees.len()));
    md.push_str(&format!("- **Folders**: {}\n", totals.folders));
    md.push_str(&format!("- **Lists**: {}\n", totals.lists));
    md.push_str(&format!("- **CSV Files**: {}\n", totals.tables));
    md.push_str(&format!(
        "- **Task Records**: {} ({} completed by detail fetch, {} partial)\n",
        totals.records, totals.records_completed, totals.records_partial
    ));
    md.push_str(&format!("- **Documents**: {}\n", totals.documents));
    md.push_str(&format!("- **Pages**: {}\n", totals.pages));
    md.push_str(&format!("- **Skipped Items**: {}\n", totals.skipped));
    md.push_str(&format!("- **Requests**: {}\n", report.requests));
    md.push_str(&format!(
        "- **Rate Limit Hits**: {}\n",
        report.rate_limit_hits
    ));
    if totals.ragged_rows > 0 {
        md.push_str(&format!(
            "- **Ragged CSV Rows**: {} (written before a later column appeared)\n",
            totals.ragged_rows
        ));
    }
    md.push('\n');

    // Per-space breakdown
    if !report.subtrees.is_empty() {
        md.push_str("## Spaces\n\n");
        md.push_str("| Space | Status | Lists | Records | Documents | Pages |\n");
        md.push_str("|-------|--------|-------|---------|-----------|-------|\n");

        for subtree in &report.subtrees {
            let stats = subtree.stats();
            let status = if subtree.is_failed() { "failed" } else { "ok" };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                table_cell(&subtree.name),
                status,
                stats.lists,
                stats.records,
                stats.documents,
                stats.pages
            ));
        }
        md.push('\n');
    }

    // Failures
    if report.has_failures() {
        md.push_str("## Failed Subtrees\n\n");
        for failed in report.failures() {
            md.push_str(&format!(
                "- **{}** (`{}`): {}\n",
                failed.name,
                failed.container_id,
                failed.cause().unwrap_or_default()
            ));
        }
        md.push('\n');
    }

    md
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ContainerStats, SubtreeOutcome};

    fn create_test_report() -> RunReport {
        let mut report = RunReport::begin("9001", None, "./archive");
        report.subtrees.push(SubtreeOutcome::completed(
            "s1",
            "Engineering",
            ContainerStats {
                lists: 3,
                tables: 3,
                records: 120,
                documents: 4,
                pages: 17,
                ..Default::default()
            },
        ));
        report.requests = 42;
        report.finish();
        report
    }

    #[test]
    fn test_format_archive_summary() {
        let markdown = format_archive_summary(&create_test_report(), Some("abc123"));

        assert!(markdown.contains("# Sumi-Archive Summary"));
        assert!(markdown.contains("- **Workspace**: 9001"));
        assert!(markdown.contains("- **Config Hash**: abc123"));
        assert!(markdown.contains("| Engineering | ok | 3 | 120 | 4 | 17 |"));
        assert!(markdown.contains("- **Requests**: 42"));
        assert!(!markdown.contains("Failed Subtrees"));
    }

    #[test]
    fn test_summary_lists_failures() {
        let mut report = create_test_report();
        report.subtrees.push(SubtreeOutcome::failed(
            "s2",
            "Ops | Infra",
            "missing workspace identifier",
            ContainerStats::default(),
        ));

        let markdown = format_archive_summary(&report, None);

        assert!(markdown.contains("| Ops \\| Infra | failed |"));
        assert!(markdown.contains("## Failed Subtrees"));
        assert!(markdown.contains("(`s2`): missing workspace identifier"));
        assert!(!markdown.contains("Config Hash"));
    }

    #[test]
    fn test_write_archive_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE_NAME);

        write_archive_summary(&create_test_report(), None, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Sumi-Archive Summary"));
    }
}
