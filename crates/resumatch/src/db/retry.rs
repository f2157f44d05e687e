//! Bounded exponential backoff for persistence writes.

use std::thread;
use std::time::Duration;

use log::{error, warn};

use super::DatabaseError;

/// Retry schedule applied to every gateway write.
///
/// Attempt `n` (1-based) that fails sleeps `initial_delay * multiplier^(n-1)`
/// before the next attempt. The last failure is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Delay slept after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, DatabaseError>
    where
        F: FnMut() -> Result<T, DatabaseError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation, attempt, attempts, delay, e
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    error!("{} failed after {} attempts: {}", operation, attempts, e);
                    return Err(e);
                }
            }
        }
    }
}
