//! Orchestration engine: the public entry point of the pipeline.
//!
//! `process_alert` fetches ranked propositions through the protected
//! fetcher; `apply_proposition` records the caller's decision (and executes
//! accepted actions); `get_proposition_logs` serves the decision log.
//!
//! Failures inside the fetch pipeline are fully absorbed: `process_alert`
//! always returns a well-formed result. Failures applying a decision
//! (unknown proposition, execution, persistence) are surfaced, because the
//! caller must react to them.

use crate::cache::PropositionCache;
use crate::config::EngineConfig;
use crate::fetcher::ProtectedFetcher;
use crate::resilience::{CircuitBreaker, CircuitState};
use crate::service::PropositionService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use remedian_core::{
    lookup_suggestions, ActionKind, Alert, AlertCategory, Decision, DecisionLogStore,
    MemoryLogStore, Proposition, PropositionLog, StoreError,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

/// Default `limit` for log queries.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Errors surfaced by `apply_proposition`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine not configured: {0}")]
    NotConfigured(String),

    #[error("proposition not found or expired: {0}")]
    NotFound(String),

    #[error("action execution failed: {0}")]
    ExecutionFailed(String),

    #[error("failed to persist decision log: {0}")]
    Persistence(#[from] StoreError),
}

/// Error from an action executor.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ExecutionError(pub String);

/// Executes accepted actions. Real execution is an external collaborator;
/// implementations return an outcome description or fail.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, proposition: &Proposition) -> Result<String, ExecutionError>;
}

/// Default executor: acknowledges the action without side effects.
pub struct DefaultExecutor;

#[async_trait]
impl ActionExecutor for DefaultExecutor {
    async fn execute(&self, proposition: &Proposition) -> Result<String, ExecutionError> {
        let outcome = match proposition.action_kind {
            ActionKind::AutoFix => "remediation dispatched",
            ActionKind::Review => "review ticket opened",
            ActionKind::Escalate => "escalated to on-call",
        };
        Ok(outcome.to_string())
    }
}

/// Whether a result carries real propositions or degraded to empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Ok,
    Degraded,
}

/// Result of processing one alert.
#[derive(Debug, Serialize)]
pub struct ProcessResult {
    pub request_id: String,
    pub alert_id: String,
    pub alert_category: AlertCategory,
    pub status: ProcessStatus,
    pub propositions: Vec<Proposition>,
    pub proposition_count: usize,
    /// Static rule-table suggestions, present only on the degraded path.
    pub fallback_suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// How a decision was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Executed,
    Rejected,
    Deferred,
}

/// Result of applying a decision to a proposition.
#[derive(Debug, Serialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub outcome: Option<String>,
}

/// A fetched proposition awaiting a decision, with the alert features that
/// the decision log will need. `alert_id` is the id of the alert actually
/// submitted, which on a cache hit differs from the alert the propositions
/// were originally fetched for.
struct PendingProposition {
    proposition: Proposition,
    alert_id: String,
    request_id: String,
    alert_severity: u8,
    alert_category: AlertCategory,
    fetch_latency_ms: u64,
    registered_at: Instant,
}

/// The orchestration engine.
///
/// Safe to share across tasks: one task per incoming alert is the expected
/// shape, with the circuit breaker as the only cross-request mutable state
/// besides the correlation table and log store.
pub struct OrchestrationEngine {
    fetcher: ProtectedFetcher,
    breaker: Arc<CircuitBreaker>,
    cache: Option<PropositionCache>,
    log_store: Arc<dyn DecisionLogStore>,
    executor: Arc<dyn ActionExecutor>,
    pending: RwLock<HashMap<String, PendingProposition>>,
    config: EngineConfig,
}

impl OrchestrationEngine {
    /// Create an engine with an in-memory log store and default executor.
    pub fn new(service: Arc<dyn PropositionService>, config: EngineConfig) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
        let fetcher = ProtectedFetcher::new(service, Arc::clone(&breaker), config.fetch.clone());
        let cache = config
            .cache
            .enabled
            .then(|| PropositionCache::new(&config.cache));

        Self {
            fetcher,
            breaker,
            cache,
            log_store: Arc::new(MemoryLogStore::new()),
            executor: Arc::new(DefaultExecutor),
            pending: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Process an incoming alert and fetch remediation propositions.
    ///
    /// Never fails: downstream trouble degrades to an empty proposition
    /// list with `status == Degraded` plus static fallback suggestions.
    /// No decision log entry is written here; that happens on decision.
    pub async fn process_alert(&self, alert: Alert) -> ProcessResult {
        let request_id = Uuid::new_v4().to_string();
        tracing::info!(
            request_id,
            alert_id = %alert.id,
            category = %alert.category,
            severity = alert.severity,
            "processing alert"
        );

        let (propositions, degraded, latency_ms) = match self.cached(&alert).await {
            Some(cached) => {
                tracing::debug!(request_id, alert_id = %alert.id, "proposition cache hit");
                // Cached propositions were fetched for an earlier alert
                // with the same content; re-home them to this one.
                let propositions = cached
                    .into_iter()
                    .map(|mut proposition| {
                        proposition.alert_id = alert.id.clone();
                        proposition
                    })
                    .collect();
                (propositions, false, 0)
            }
            None => {
                let fetched = self.fetcher.fetch(&alert, &request_id).await;
                if !fetched.degraded && !fetched.propositions.is_empty() {
                    if let Some(cache) = &self.cache {
                        cache.insert(&alert, fetched.propositions.clone()).await;
                    }
                }
                (
                    fetched.propositions,
                    fetched.degraded,
                    fetched.latency.as_millis() as u64,
                )
            }
        };

        self.register(&alert, &request_id, &propositions, latency_ms);

        let fallback_suggestions = if degraded {
            lookup_suggestions(alert.category, &alert.description)
        } else {
            Vec::new()
        };

        let status = if degraded {
            ProcessStatus::Degraded
        } else {
            ProcessStatus::Ok
        };

        ProcessResult {
            request_id,
            alert_id: alert.id,
            alert_category: alert.category,
            status,
            proposition_count: propositions.len(),
            propositions,
            fallback_suggestions,
            timestamp: Utc::now(),
        }
    }

    /// Apply a caller decision to a previously fetched proposition.
    ///
    /// Executes the action when accepted, then appends a decision log entry
    /// capturing the alert features, the decision and the outcome. An
    /// unknown or expired id fails with `NotFound` and logs nothing; a
    /// failed append is surfaced as `Persistence`; training records must
    /// not be dropped silently.
    pub async fn apply_proposition(
        &self,
        proposition_id: &str,
        decision: Decision,
    ) -> Result<ExecutionResult, EngineError> {
        self.prune_expired();

        let entry = {
            let pending = self.pending.read();
            let entry = pending
                .get(proposition_id)
                .ok_or_else(|| EngineError::NotFound(proposition_id.to_string()))?;
            PendingSnapshot::from(entry)
        };

        let (status, outcome, execution_error) = match decision {
            Decision::Accepted => match self.executor.execute(&entry.proposition).await {
                Ok(outcome) => (ExecutionStatus::Executed, Some(outcome), None),
                Err(error) => (
                    ExecutionStatus::Executed,
                    Some(format!("execution failed: {error}")),
                    Some(error),
                ),
            },
            Decision::Rejected => (ExecutionStatus::Rejected, None, None),
            Decision::Deferred => (ExecutionStatus::Deferred, None, None),
        };

        self.log_store.append(PropositionLog {
            alert_id: entry.alert_id.clone(),
            request_id: entry.request_id.clone(),
            proposition_id: proposition_id.to_string(),
            decision,
            outcome: outcome.clone(),
            recorded_at: Utc::now(),
            alert_severity: entry.alert_severity,
            alert_category: entry.alert_category,
            proposition_confidence: entry.proposition.confidence,
            fetch_latency_ms: entry.fetch_latency_ms,
        })?;

        // Deferred propositions stay decidable until they expire.
        if decision != Decision::Deferred {
            self.pending.write().remove(proposition_id);
        }

        tracing::info!(
            proposition_id,
            request_id = %entry.request_id,
            %decision,
            "decision recorded"
        );

        if let Some(error) = execution_error {
            return Err(EngineError::ExecutionFailed(error.0));
        }
        Ok(ExecutionResult { status, outcome })
    }

    /// Query decision log entries, most recent first.
    pub fn get_proposition_logs(
        &self,
        alert_id: Option<&str>,
        limit: usize,
    ) -> Vec<PropositionLog> {
        self.log_store.query(alert_id, limit)
    }

    /// Current circuit breaker state, for status surfaces.
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    async fn cached(&self, alert: &Alert) -> Option<Vec<Proposition>> {
        match &self.cache {
            Some(cache) => cache.get(alert).await,
            None => None,
        }
    }

    fn register(&self, alert: &Alert, request_id: &str, propositions: &[Proposition], latency_ms: u64) {
        self.prune_expired();
        let mut pending = self.pending.write();
        for proposition in propositions {
            pending.insert(
                proposition.id.clone(),
                PendingProposition {
                    proposition: proposition.clone(),
                    alert_id: alert.id.clone(),
                    request_id: request_id.to_string(),
                    alert_severity: alert.severity,
                    alert_category: alert.category,
                    fetch_latency_ms: latency_ms,
                    registered_at: Instant::now(),
                },
            );
        }
    }

    fn prune_expired(&self) {
        let ttl = self.config.proposition_ttl;
        self.pending
            .write()
            .retain(|_, entry| entry.registered_at.elapsed() < ttl);
    }
}

/// Owned copy of a pending entry, taken so the table lock is not held
/// across the executor await point.
struct PendingSnapshot {
    proposition: Proposition,
    alert_id: String,
    request_id: String,
    alert_severity: u8,
    alert_category: AlertCategory,
    fetch_latency_ms: u64,
}

impl From<&PendingProposition> for PendingSnapshot {
    fn from(entry: &PendingProposition) -> Self {
        Self {
            proposition: entry.proposition.clone(),
            alert_id: entry.alert_id.clone(),
            request_id: entry.request_id.clone(),
            alert_severity: entry.alert_severity,
            alert_category: entry.alert_category,
            fetch_latency_ms: entry.fetch_latency_ms,
        }
    }
}

/// Builder for [`OrchestrationEngine`].
pub struct OrchestrationEngineBuilder {
    service: Option<Arc<dyn PropositionService>>,
    config: EngineConfig,
    log_store: Option<Arc<dyn DecisionLogStore>>,
    executor: Option<Arc<dyn ActionExecutor>>,
}

impl OrchestrationEngineBuilder {
    pub fn new() -> Self {
        Self {
            service: None,
            config: EngineConfig::default(),
            log_store: None,
            executor: None,
        }
    }

    pub fn service(mut self, service: Arc<dyn PropositionService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn log_store(mut self, store: Arc<dyn DecisionLogStore>) -> Self {
        self.log_store = Some(store);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the engine. Fails if no proposition service was provided.
    pub fn build(self) -> Result<OrchestrationEngine, EngineError> {
        let service = self
            .service
            .ok_or_else(|| EngineError::NotConfigured("no proposition service set".to_string()))?;
        let config = self.config;
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
        let fetcher = ProtectedFetcher::new(service, Arc::clone(&breaker), config.fetch.clone());
        let cache = config
            .cache
            .enabled
            .then(|| PropositionCache::new(&config.cache));

        Ok(OrchestrationEngine {
            fetcher,
            breaker,
            cache,
            log_store: self
                .log_store
                .unwrap_or_else(|| Arc::new(MemoryLogStore::new())),
            executor: self.executor.unwrap_or_else(|| Arc::new(DefaultExecutor)),
            pending: RwLock::new(HashMap::new()),
            config,
        })
    }
}

impl Default for OrchestrationEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
