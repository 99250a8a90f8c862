//! Output module for writing the archive to disk
//!
//! This module handles:
//! - Flattening task records into CSV, in batch and streaming modes
//! - Mapping remote names onto a safe directory layout
//! - Writing page markdown files
//! - Generating the archive summary report and run statistics

mod layout;
pub mod stats;
mod streaming;
mod summary;
mod tabular;

pub use layout::{
    page_markdown, sanitize_name, write_page_file, write_page_slots, NameAllocator, OutputTree,
    EMPTY_PAGE_PLACEHOLDER, UNFETCHED_PAGE_PLACEHOLDER, UNTITLED,
};
pub use stats::print_report;
pub use streaming::StreamingTableWriter;
pub use summary::{format_archive_summary, write_archive_summary, SUMMARY_FILE_NAME};
pub use tabular::{
    collect_schema, escape_csv, export_batch, flatten_record, format_header, format_row,
    render_batch, write_batch, FieldSchema, FlatRecord, TableSummary, ARRAY_SEPARATOR,
};

use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
