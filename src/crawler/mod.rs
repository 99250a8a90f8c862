//! Crawler module for walking the remote workspace
//!
//! This module contains the traversal logic, including:
//! - The `WorkspaceSource` seam and its HTTP implementation
//! - Fixed-delay request pacing with bounded retries of rate-limited calls
//! - Multi-path document discovery with deduplication
//! - Overall archive coordination with per-space failure isolation

mod coordinator;
mod discovery;
mod http;
mod pacing;
mod source;

pub use coordinator::{
    is_complete, ArchiveOptions, Orchestrator, COMPLETE_FIELDS, MAX_RECORD_PAGES,
    RATE_LIMIT_RETRIES,
};
pub use discovery::DiscoveryMap;
pub use http::{build_http_client, HttpSource};
pub use pacing::Pacer;
pub use source::{
    DocumentIndex, FetchError, FetchResult, Listing, PageStrategy, Probe, RecordPage, WorkspaceSource,
    DOCUMENT_INDEXES, PAGE_STRATEGIES,
};

use crate::config::Config;
use crate::output::{write_archive_summary, SUMMARY_FILE_NAME};
use crate::state::RunReport;
use crate::Result;
use std::path::Path;

/// Runs a complete archive against the remote API
///
/// This is the main entry point for an archive run. It will:
/// 1. Build the HTTP client and source
/// 2. Walk every space of the workspace (or the scoped one)
/// 3. Write lists as CSV and documents as markdown
/// 4. Write `ARCHIVE_SUMMARY.md` at the output root
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `token` - The resolved API token
/// * `config_hash` - Hash of the configuration file, recorded in the summary
///
/// # Returns
///
/// * `Ok(RunReport)` - The run finished; individual spaces may still have failed
/// * `Err(ArchiveError)` - The run could not start or the workspace could not be listed
pub async fn archive(config: &Config, token: &str, config_hash: Option<&str>) -> Result<RunReport> {
    let source = HttpSource::from_config(config, token)?;
    let mut orchestrator = Orchestrator::new(source, ArchiveOptions::from_config(config));
    let report = orchestrator.run().await?;

    let summary_path = Path::new(&config.export.output_dir).join(SUMMARY_FILE_NAME);
    write_archive_summary(&report, config_hash, &summary_path)?;
    tracing::info!("Summary written to {}", summary_path.display());

    Ok(report)
}
