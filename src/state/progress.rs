/// Processed/total counter for the items of one traversal level
///
/// Only used for log lines; a rate limit is reported against the position
/// reached at the level where it happened.
#[derive(Debug, Clone)]
pub struct LevelProgress {
    level: &'static str,
    processed: usize,
    total: usize,
}

impl LevelProgress {
    pub fn new(level: &'static str, total: usize) -> Self {
        Self {
            level,
            processed: 0,
            total,
        }
    }

    /// Adds newly discovered items to the total
    pub fn extend(&mut self, more: usize) {
        self.total += more;
    }

    /// Marks one more item as processed
    pub fn advance(&mut self) {
        self.processed += 1;
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Logs a rate-limit hit with the progress reached so far
    pub fn log_rate_limited(&self, item: &str) {
        tracing::warn!(
            "Rate limited at {} {} ({}/{} {}s processed), continuing",
            self.level,
            item,
            self.processed,
            self.total,
            self.level
        );
    }
}

impl std::fmt::Display for LevelProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} {}s", self.processed, self.total, self.level)
    }
}
