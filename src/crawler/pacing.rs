//! Fixed-delay request pacing
//!
//! Requests are strictly sequential. Before each one the pacer waits until
//! `delay` has passed since the previous request started. A rate-limit answer
//! does not change the delay; it is only counted.

use std::time::Duration;
use tokio::time::Instant;

/// Spaces out remote requests and counts them
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_request: Option<Instant>,
    requests: u64,
    rate_limit_hits: u64,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: None,
            requests: 0,
            rate_limit_hits: 0,
        }
    }

    /// Time left before the next request may start, if any
    ///
    /// # Arguments
    ///
    /// * `now` - The current time instant
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let ready_at = last + self.delay;
        if ready_at > now {
            Some(ready_at - now)
        } else {
            None
        }
    }

    /// Waits out the delay, then records a request as started
    pub async fn wait(&mut self) {
        if let Some(remaining) = self.time_until_next(Instant::now()) {
            tracing::trace!("Pacing: waiting {}ms", remaining.as_millis());
            tokio::time::sleep(remaining).await;
        }
        self.last_request = Some(Instant::now());
        self.requests += 1;
    }

    pub fn note_rate_limit(&mut self) {
        self.rate_limit_hits += 1;
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn rate_limit_hits(&self) -> u64 {
        self.rate_limit_hits
    }
}
