//! Protected proposition fetch.
//!
//! Wraps the downstream predictive service with bounded retries,
//! exponential backoff and the circuit breaker. Total failure degrades to
//! an empty result; no error ever crosses this boundary.

use crate::config::FetchConfig;
use crate::resilience::{BackoffScheduler, CircuitBreaker};
use crate::service::PropositionService;
use remedian_core::{Alert, Proposition};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a protected fetch.
#[derive(Debug)]
pub struct FetchResult {
    pub propositions: Vec<Proposition>,

    /// Downstream invocations actually made.
    pub attempts: u32,

    /// True when the empty result came from failure or an open circuit,
    /// as opposed to the service genuinely having nothing to suggest.
    pub degraded: bool,

    /// Wall time spent inside the fetch, including backoff sleeps.
    pub latency: Duration,
}

/// Fetches propositions through the resilience stack.
///
/// The caller's task suspends during backoff sleeps; other alerts keep
/// processing. Dropping the returned future aborts the in-flight call and
/// stops further retries; breaker updates already recorded stand.
pub struct ProtectedFetcher {
    service: Arc<dyn PropositionService>,
    breaker: Arc<CircuitBreaker>,
    backoff: BackoffScheduler,
    config: FetchConfig,
}

impl ProtectedFetcher {
    pub fn new(
        service: Arc<dyn PropositionService>,
        breaker: Arc<CircuitBreaker>,
        config: FetchConfig,
    ) -> Self {
        let backoff = BackoffScheduler::new(config.backoff.clone());
        Self {
            service,
            breaker,
            backoff,
            config,
        }
    }

    /// Fetch propositions for an alert. Never fails: every downstream
    /// failure mode degrades to an empty result.
    pub async fn fetch(&self, alert: &Alert, request_id: &str) -> FetchResult {
        let started = Instant::now();
        let mut attempts = 0u32;

        for attempt in 0..=self.config.max_retries {
            if !self.breaker.call_permitted() {
                tracing::warn!(
                    request_id,
                    alert_id = %alert.id,
                    attempt,
                    "circuit open, aborting fetch"
                );
                break;
            }

            attempts += 1;
            let call = self.service.fetch_propositions(alert, request_id);
            let outcome = tokio::time::timeout(self.config.call_timeout, call).await;

            match outcome {
                Ok(Ok(propositions)) => {
                    self.breaker.record_success();
                    tracing::info!(
                        request_id,
                        alert_id = %alert.id,
                        attempt,
                        count = propositions.len(),
                        "fetch succeeded"
                    );
                    return FetchResult {
                        propositions,
                        attempts,
                        degraded: false,
                        latency: started.elapsed(),
                    };
                }
                Ok(Err(error)) => {
                    self.breaker.record_failure();
                    tracing::warn!(
                        request_id,
                        alert_id = %alert.id,
                        attempt,
                        %error,
                        "fetch attempt failed"
                    );
                }
                Err(_) => {
                    self.breaker.record_failure();
                    tracing::warn!(
                        request_id,
                        alert_id = %alert.id,
                        attempt,
                        timeout = ?self.config.call_timeout,
                        "fetch attempt timed out"
                    );
                }
            }

            if attempt < self.config.max_retries {
                let delay = self.backoff.next_delay(attempt);
                tracing::debug!(request_id, attempt, ?delay, "backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }

        tracing::warn!(
            request_id,
            alert_id = %alert.id,
            attempts,
            "fetch degraded to empty result"
        );
        FetchResult {
            propositions: Vec::new(),
            attempts,
            degraded: true,
            latency: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackoffConfig, CircuitBreakerConfig};
    use crate::service::ServiceError;
    use async_trait::async_trait;
    use remedian_core::{ActionKind, AlertCategory};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn alert() -> Alert {
        Alert::new("a-1", AlertCategory::CiFailure, 6, "assertion failed").unwrap()
    }

    fn proposition() -> Proposition {
        Proposition {
            id: "p-1".to_string(),
            alert_id: "a-1".to_string(),
            action_kind: ActionKind::AutoFix,
            confidence: 0.9,
            recommendation: "rerun".to_string(),
            execution_details: HashMap::new(),
        }
    }

    /// Fails the first `fail_first` calls, then succeeds.
    struct FlakyService {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl PropositionService for FlakyService {
        async fn fetch_propositions(
            &self,
            _alert: &Alert,
            _request_id: &str,
        ) -> Result<Vec<Proposition>, ServiceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(ServiceError::Transport("connection refused".to_string()))
            } else {
                Ok(vec![proposition()])
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    /// Never returns within any timeout.
    struct HangingService;

    #[async_trait]
    impl PropositionService for HangingService {
        async fn fetch_propositions(
            &self,
            _alert: &Alert,
            _request_id: &str,
        ) -> Result<Vec<Proposition>, ServiceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn fetcher_with(service: Arc<dyn PropositionService>, breaker: Arc<CircuitBreaker>) -> ProtectedFetcher {
        ProtectedFetcher::new(
            service,
            breaker,
            FetchConfig {
                max_retries: 3,
                call_timeout: Duration::from_secs(30),
                backoff: BackoffConfig {
                    jitter: false,
                    ..Default::default()
                },
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failures_yield_empty_and_max_attempts() {
        let service = Arc::new(FlakyService {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
        });
        let fetcher = fetcher_with(service.clone(), Arc::new(CircuitBreaker::default()));

        let result = fetcher.fetch(&alert(), "req-1").await;
        assert!(result.degraded);
        assert!(result.propositions.is_empty());
        assert_eq!(result.attempts, 4); // max_retries + 1
        assert_eq!(service.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_two_failures() {
        let service = Arc::new(FlakyService {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let fetcher = fetcher_with(service.clone(), Arc::new(CircuitBreaker::default()));

        let result = fetcher.fetch(&alert(), "req-2").await;
        assert!(!result.degraded);
        assert_eq!(result.propositions.len(), 1);
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let breaker = Arc::new(CircuitBreaker::default());
        let fetcher = fetcher_with(Arc::new(HangingService), breaker.clone());

        let result = fetcher.fetch(&alert(), "req-3").await;
        assert!(result.degraded);
        assert_eq!(result.attempts, 4);
        // Four timeouts were reported to the breaker.
        assert!(matches!(
            breaker.state(),
            crate::resilience::CircuitState::Closed {
                consecutive_failures: 4
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_aborts_without_calling_downstream() {
        let service = Arc::new(FlakyService {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
        });
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        }));
        breaker.record_failure(); // circuit now open

        let fetcher = fetcher_with(service.clone(), breaker);
        let result = fetcher.fetch(&alert(), "req-4").await;

        assert!(result.degraded);
        assert_eq!(result.attempts, 0);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_opens_mid_loop_and_stops_retries() {
        let service = Arc::new(FlakyService {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
        });
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        }));

        let fetcher = fetcher_with(service.clone(), breaker);
        let result = fetcher.fetch(&alert(), "req-5").await;

        // Two failures trip the breaker; the third permission check aborts.
        assert!(result.degraded);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_fetch_leaves_breaker_coherent() {
        let service = Arc::new(FlakyService {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
        });
        let breaker = Arc::new(CircuitBreaker::default());
        let fetcher = Arc::new(fetcher_with(service.clone(), breaker.clone()));

        let handle = tokio::spawn({
            let fetcher = Arc::clone(&fetcher);
            async move { fetcher.fetch(&alert(), "req-6").await }
        });

        // Let the first attempt fail and the task enter its backoff sleep,
        // then drop it mid-flight.
        while service.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        // The failure recorded before the abort stands, and the breaker
        // still answers.
        assert!(breaker.call_permitted());
        assert!(matches!(
            breaker.state(),
            crate::resilience::CircuitState::Closed {
                consecutive_failures: 1
            }
        ));
    }
}
