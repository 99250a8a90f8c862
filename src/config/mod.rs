//! Configuration module for Sumi-Archive
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_archive::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("archive.toml")).unwrap();
//! println!("Archiving workspace {}", config.workspace.root_id);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, Config, ExportConfig, TabularMode, WorkspaceConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, resolve_token,
};
pub use validation::validate;
