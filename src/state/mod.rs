//! State module for tracking archive progress
//!
//! This module provides the per-item and per-subtree outcome values produced
//! while walking the workspace.
//!
//! # Components
//!
//! - `ItemOutcome`: what happened to one record, listing or page fetch
//! - `ContainerStats`: counters for one subtree
//! - `SubtreeOutcome`: completed or failed result of one space
//! - `RunReport`: the whole run, used for the printed report and the summary file
//! - `LevelProgress`: processed/total counter for rate-limit log lines

mod outcome;
mod progress;

// Re-export main types
pub use outcome::{ContainerStats, ItemOutcome, RunReport, SubtreeOutcome, SubtreeResult};
pub use progress::LevelProgress;
