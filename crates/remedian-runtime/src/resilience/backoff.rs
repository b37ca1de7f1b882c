//! Exponential backoff with jitter.

use crate::config::BackoffConfig;
use rand::Rng;
use std::time::Duration;

/// Computes retry delays: `min(max_delay, initial_delay * base^attempt)`,
/// optionally jittered by uniform sampling from `[delay/2, delay]`.
///
/// The scheduler holds no retry-count state; the caller tracks attempts and
/// stops once `attempt >= max_retries`.
#[derive(Debug, Clone)]
pub struct BackoffScheduler {
    config: BackoffConfig,
}

impl BackoffScheduler {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay to sleep after a failed attempt. `attempt` is zero-indexed.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        if !self.config.jitter {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }

    /// Un-jittered delay for an attempt.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let secs = self.config.initial_delay.as_secs_f64()
            * self.config.exponential_base.powi(attempt as i32);
        // powi overflows to infinity for large attempts; the cap absorbs it.
        let capped = secs.min(self.config.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

impl Default for BackoffScheduler {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
