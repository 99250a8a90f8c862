//! Sumi-Archive: a workspace archiver
//!
//! This crate walks a hierarchical remote workspace (spaces, folders, task lists
//! and documents made of nested pages) and mirrors it into a local file tree:
//! pages become markdown files, task lists become CSV files, and the remote
//! hierarchy becomes directory nesting.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod render;
pub mod state;
pub mod tree;

use thiserror::Error;

/// Main error type for Sumi-Archive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A failure that invalidates a whole subtree (one space) of the walk
    #[error("Structural failure in {id}: {reason}")]
    Structural { id: String, reason: String },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Builds a structural failure for the subtree rooted at `id`
    pub fn structural(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Structural {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No API token: set `token` or the environment variable `{0}`")]
    MissingToken(String),
}

/// Result type alias for Sumi-Archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{archive, HttpSource, Orchestrator, WorkspaceSource};
pub use model::{ContentNode, NodeKind, PageNode, TabularRecord};
pub use render::render_markdown;
pub use state::{RunReport, SubtreeOutcome};
pub use tree::{build_forest, build_page_hierarchy, PageSlot};
