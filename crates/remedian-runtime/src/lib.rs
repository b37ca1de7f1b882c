//! # remedian-runtime
//!
//! Fault-tolerant proposition-fetch pipeline.
//!
//! The engine receives operational alerts, fetches ranked remediation
//! propositions from a downstream predictive service, and survives that
//! service's failures: bounded retries with jittered exponential backoff, a
//! circuit breaker, a hard per-call timeout, and degradation to an empty
//! (but well-formed) result when all else fails. Every applied decision is
//! appended to the decision log as future training data.
//!
//! ## Example
//!
//! ```rust,ignore
//! use remedian_core::{Alert, AlertCategory, Decision};
//! use remedian_runtime::{EngineConfig, HttpPropositionService, OrchestrationEngine};
//! use std::sync::Arc;
//!
//! let config = EngineConfig::default();
//! let service = HttpPropositionService::new("http://predictive:8001", config.fetch.call_timeout)?;
//! let engine = OrchestrationEngine::new(Arc::new(service), config);
//!
//! let alert = Alert::new("ci-1342", AlertCategory::CiFailure, 7, "AssertionError in checkout")?;
//! let result = engine.process_alert(alert).await;
//! for proposition in &result.propositions {
//!     println!("{}: {}", proposition.id, proposition.recommendation);
//! }
//! engine.apply_proposition(&result.propositions[0].id, Decision::Accepted).await?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod fetcher;
pub mod resilience;
pub mod service;

pub use cache::PropositionCache;
pub use config::{
    BackoffConfig, CacheConfig, CircuitBreakerConfig, ConfigError, EngineConfig, FetchConfig,
};
pub use engine::{
    ActionExecutor, DefaultExecutor, EngineError, ExecutionError, ExecutionResult,
    ExecutionStatus, OrchestrationEngine, OrchestrationEngineBuilder, ProcessResult,
    ProcessStatus, DEFAULT_LOG_LIMIT,
};
pub use fetcher::{FetchResult, ProtectedFetcher};
pub use resilience::{BackoffScheduler, CircuitBreaker, CircuitState};
pub use service::{
    ApiCredential, HttpPropositionService, PropositionService, ServiceError,
};
