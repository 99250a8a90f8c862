use chrono::{DateTime, Utc};
use std::fmt;

/// What happened to a single fetched item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A detail fetch completed the item before it was archived
    Completed,

    /// The detail fetch failed; the listing version was archived instead
    KeptPartial,

    /// The item could not be fetched and was left out
    Skipped { reason: String },

    /// The remote asked to slow down; the item counts as having no children
    RateLimited,
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::KeptPartial => f.write_str("kept partial"),
            Self::Skipped { reason } => write!(f, "skipped ({})", reason),
            Self::RateLimited => f.write_str("rate limited"),
        }
    }
}

/// Counters for one archived subtree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub folders: usize,
    pub lists: usize,
    /// CSV files written
    pub tables: usize,
    /// Task records written
    pub records: usize,
    pub records_completed: usize,
    pub records_partial: usize,
    pub documents: usize,
    /// Page files written
    pub pages: usize,
    /// Items skipped after a fetch failure
    pub skipped: usize,
    /// Listings or fetches answered with a rate limit
    pub rate_limited: usize,
    /// Streaming rows narrower than their table's final header
    pub ragged_rows: usize,
}

impl ContainerStats {
    /// Counts one item outcome
    pub fn absorb(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Completed => self.records_completed += 1,
            ItemOutcome::KeptPartial => self.records_partial += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::RateLimited => self.rate_limited += 1,
        }
    }

    /// Adds another set of counters to this one
    pub fn merge(&mut self, other: &ContainerStats) {
        self.folders += other.folders;
        self.lists += other.lists;
        self.tables += other.tables;
        self.records += other.records;
        self.records_completed += other.records_completed;
        self.records_partial += other.records_partial;
        self.documents += other.documents;
        self.pages += other.pages;
        self.skipped += other.skipped;
        self.rate_limited += other.rate_limited;
        self.ragged_rows += other.ragged_rows;
    }
}

/// How a subtree ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubtreeResult {
    Completed(ContainerStats),

    /// Aborted by a structural failure; `partial` counts what was written first
    Failed {
        cause: String,
        partial: ContainerStats,
    },
}

/// Result of archiving one top-level container (a space)
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeOutcome {
    pub container_id: String,
    pub name: String,
    pub result: SubtreeResult,
}

impl SubtreeOutcome {
    pub fn completed(id: impl Into<String>, name: impl Into<String>, stats: ContainerStats) -> Self {
        Self {
            container_id: id.into(),
            name: name.into(),
            result: SubtreeResult::Completed(stats),
        }
    }

    pub fn failed(
        id: impl Into<String>,
        name: impl Into<String>,
        cause: impl Into<String>,
        partial: ContainerStats,
    ) -> Self {
        Self {
            container_id: id.into(),
            name: name.into(),
            result: SubtreeResult::Failed {
                cause: cause.into(),
                partial,
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.result, SubtreeResult::Failed { .. })
    }

    /// Counters of the subtree, partial ones for a failed subtree
    pub fn stats(&self) -> &ContainerStats {
        match &self.result {
            SubtreeResult::Completed(stats) => stats,
            SubtreeResult::Failed { partial, .. } => partial,
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match &self.result {
            SubtreeResult::Completed(_) => None,
            SubtreeResult::Failed { cause, .. } => Some(cause),
        }
    }
}

/// Everything a finished run reports
#[derive(Debug, Clone)]
pub struct RunReport {
    pub workspace_id: String,
    pub scope_id: Option<String>,
    pub output_dir: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub subtrees: Vec<SubtreeOutcome>,
    /// Remote requests issued
    pub requests: u64,
    /// Requests answered with a rate limit
    pub rate_limit_hits: u64,
}

impl RunReport {
    /// Starts a report stamped with the current time
    pub fn begin(
        workspace_id: impl Into<String>,
        scope_id: Option<String>,
        output_dir: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            scope_id,
            output_dir: output_dir.into(),
            started_at: Utc::now(),
            finished_at: None,
            subtrees: Vec::new(),
            requests: 0,
            rate_limit_hits: 0,
        }
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Run duration in seconds, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Counters summed over every subtree, failed ones included
    pub fn totals(&self) -> ContainerStats {
        let mut totals = ContainerStats::default();
        for subtree in &self.subtrees {
            totals.merge(subtree.stats());
        }
        totals
    }

    pub fn failures(&self) -> impl Iterator<Item = &SubtreeOutcome> {
        self.subtrees.iter().filter(|s| s.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.subtrees.iter().any(SubtreeOutcome::is_failed)
    }
}
