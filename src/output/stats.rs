//! Run statistics printed after an archive run

use crate::state::RunReport;

/// Prints a run report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The finished run report
pub fn print_report(report: &RunReport) {
    let totals = report.totals();

    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Workspace: {}", report.workspace_id);
    if let Some(scope) = &report.scope_id {
        println!("  Scope: {}", scope);
    }
    println!("  Output: {}", report.output_dir);
    if let Some(duration) = report.duration_seconds() {
        println!("  Duration: {}s", duration);
    }
    println!(
        "  Requests: {} ({} rate limited)",
        report.requests, report.rate_limit_hits
    );
    println!();

    println!("Archived:");
    println!("  Folders: {}", totals.folders);
    println!("  Lists: {} ({} CSV files)", totals.lists, totals.tables);
    println!(
        "  Task records: {} ({} completed, {} partial)",
        totals.records, totals.records_completed, totals.records_partial
    );
    println!("  Documents: {}", totals.documents);
    println!("  Pages: {}", totals.pages);
    if totals.skipped > 0 {
        println!("  Skipped items: {}", totals.skipped);
    }
    if totals.ragged_rows > 0 {
        println!("  Ragged CSV rows: {}", totals.ragged_rows);
    }
    println!();

    if !report.subtrees.is_empty() {
        println!("Spaces:");
        for subtree in &report.subtrees {
            let stats = subtree.stats();
            match subtree.cause() {
                None => println!(
                    "  ✓ {} ({} records, {} pages)",
                    subtree.name, stats.records, stats.pages
                ),
                Some(cause) => println!("  ✗ {} [{}]: {}", subtree.name, subtree.container_id, cause),
            }
        }
        println!();
    }

    let total = report.subtrees.len();
    let succeeded = total - report.failures().count();
    let success_rate = if total > 0 {
        (succeeded as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} spaces archived)",
        success_rate, succeeded, total
    );
}
