use std::fmt::Display;
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Call `f` until it succeeds or the attempts run out; returns the last
    /// error on exhaustion. At least one attempt is always made.
    pub fn run<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut retry = 0;
        loop {
            match f() {
                Ok(v) => return Ok(v),
                Err(e) if retry + 1 >= attempts => return Err(e),
                Err(e) => {
                    let wait = self.backoff(retry);
                    debug!("attempt {} failed: {e}; retrying in {wait:?}", retry + 1);
                    thread::sleep(wait);
                    retry += 1;
                }
            }
        }
    }
}
