//! Resilience primitives for the proposition-fetch pipeline.
//!
//! - Exponential backoff with jitter between retries
//! - Circuit breaker gating calls to the predictive service

mod backoff;
mod circuit_breaker;

pub use backoff::BackoffScheduler;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
