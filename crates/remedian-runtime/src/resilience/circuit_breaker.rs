//! Circuit breaker for the downstream predictive service.
//!
//! When calls fail repeatedly the circuit opens and subsequent fetches fail
//! fast instead of piling onto a struggling dependency. One breaker guards
//! one downstream dependency; inject it rather than sharing a global.

use crate::config::CircuitBreakerConfig;
use parking_lot::Mutex;
use std::time::Instant;

/// State of the circuit.
///
/// Counters live inside the state they belong to, so a state transition and
/// its counter reset are a single assignment under the lock; concurrent
/// callers can never observe counters from two generations of the machine.
#[derive(Debug, Clone)]
pub enum CircuitState {
    /// Normal operation; counts consecutive failures.
    Closed { consecutive_failures: u32 },

    /// Failing fast; no downstream calls until the timeout elapses.
    Open { opened_at: Instant },

    /// Probing recovery; one trial call at a time.
    HalfOpen {
        consecutive_successes: u32,
        probe_started: Option<Instant>,
    },
}

impl CircuitState {
    /// Short name for logs and status output.
    pub fn name(&self) -> &'static str {
        match self {
            CircuitState::Closed { .. } => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen { .. } => "half_open",
        }
    }
}

/// Circuit breaker with lazy recovery.
///
/// There is no background timer: the OPEN → HALF_OPEN transition happens on
/// the first `call_permitted` after the timeout elapses.
pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Mutex::new(CircuitState::Closed {
                consecutive_failures: 0,
            }),
            config,
        }
    }

    /// Whether a downstream call may proceed right now.
    ///
    /// Claims the HALF_OPEN probe slot when it grants a trial call, so only
    /// one concurrent probe is ever admitted. A probe whose caller vanished
    /// without reporting is reclaimed after `breaker_timeout`, so a
    /// cancelled fetch cannot wedge the breaker.
    pub fn call_permitted(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed { .. } => true,
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.config.breaker_timeout {
                    *state = CircuitState::HalfOpen {
                        consecutive_successes: 0,
                        probe_started: Some(Instant::now()),
                    };
                    tracing::info!("circuit half-open, admitting trial call");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen {
                consecutive_successes,
                probe_started,
            } => match probe_started {
                Some(started) if started.elapsed() < self.config.breaker_timeout => false,
                _ => {
                    *state = CircuitState::HalfOpen {
                        consecutive_successes,
                        probe_started: Some(Instant::now()),
                    };
                    true
                }
            },
        }
    }

    /// Report a successful downstream call.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed { .. } => {
                *state = CircuitState::Closed {
                    consecutive_failures: 0,
                };
            }
            CircuitState::HalfOpen {
                consecutive_successes,
                ..
            } => {
                let successes = consecutive_successes + 1;
                if successes >= self.config.success_threshold {
                    *state = CircuitState::Closed {
                        consecutive_failures: 0,
                    };
                    tracing::info!(successes, "circuit closed after successful recovery");
                } else {
                    *state = CircuitState::HalfOpen {
                        consecutive_successes: successes,
                        probe_started: None,
                    };
                }
            }
            // A late success from before the circuit opened; ignore.
            CircuitState::Open { .. } => {}
        }
    }

    /// Report a failed downstream call.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    *state = CircuitState::Open {
                        opened_at: Instant::now(),
                    };
                    tracing::warn!(failures, "circuit opened after repeated failures");
                } else {
                    *state = CircuitState::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            CircuitState::HalfOpen { .. } => {
                *state = CircuitState::Open {
                    opened_at: Instant::now(),
                };
                tracing::warn!("circuit reopened after failed recovery attempt");
            }
            // Already open; the window restarts only from a failed probe.
            CircuitState::Open { .. } => {}
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CircuitState {
        self.state.lock().clone()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn breaker(failure_threshold: u32, success_threshold: u32, timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            breaker_timeout: timeout,
        })
    }

    #[test]
    fn test_starts_closed() {
        let cb = CircuitBreaker::default();
        assert!(cb.call_permitted());
        assert_eq!(cb.state().name(), "closed");
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let cb = breaker(5, 2, Duration::from_secs(60));
        for _ in 0..4 {
            cb.record_failure();
            assert!(cb.call_permitted());
        }
        cb.record_failure();
        assert_eq!(cb.state().name(), "open");
        assert!(!cb.call_permitted());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(3, 2, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state().name(), "closed");
        cb.record_failure();
        assert_eq!(cb.state().name(), "open");
    }

    #[test]
    fn test_open_transitions_to_half_open_after_timeout() {
        let cb = breaker(1, 2, Duration::from_millis(10));
        cb.record_failure();
        assert!(!cb.call_permitted());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.call_permitted());
        assert_eq!(cb.state().name(), "half_open");
    }

    #[test]
    fn test_half_open_admits_single_probe() {
        let cb = breaker(1, 2, Duration::from_millis(50));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(60));

        // First caller claims the probe slot; a concurrent second is denied.
        assert!(cb.call_permitted());
        assert!(!cb.call_permitted());

        // Reporting releases the slot for the next trial.
        cb.record_success();
        assert!(cb.call_permitted());
    }

    #[test]
    fn test_abandoned_probe_is_reclaimed_after_timeout() {
        let cb = breaker(1, 2, Duration::from_millis(30));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(40));

        // A trial call is admitted but its caller never reports back.
        assert!(cb.call_permitted());
        assert!(!cb.call_permitted());

        // After another timeout window the stale probe slot is reclaimed.
        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.call_permitted());
        assert_eq!(cb.state().name(), "half_open");
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let cb = breaker(1, 2, Duration::from_millis(0));
        cb.record_failure();
        assert!(cb.call_permitted());
        cb.record_failure();
        assert_eq!(cb.state().name(), "open");
    }

    #[test]
    fn test_success_threshold_closes_circuit() {
        let cb = breaker(1, 2, Duration::from_millis(0));
        cb.record_failure();

        assert!(cb.call_permitted());
        cb.record_success();
        assert_eq!(cb.state().name(), "half_open");

        assert!(cb.call_permitted());
        cb.record_success();
        assert_eq!(cb.state().name(), "closed");
        match cb.state() {
            CircuitState::Closed {
                consecutive_failures,
            } => assert_eq!(consecutive_failures, 0),
            other => panic!("expected closed, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_failures_open_once() {
        use std::sync::Arc;

        let cb = Arc::new(breaker(5, 2, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cb = Arc::clone(&cb);
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    cb.call_permitted();
                    cb.record_failure();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        // Whatever the interleaving, the machine lands in a valid state.
        assert!(matches!(cb.state(), CircuitState::Open { .. }));
    }
}
