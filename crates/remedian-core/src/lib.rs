//! # remedian-core
//!
//! Deterministic domain layer for the remedian remediation pipeline.
//!
//! This crate holds everything that needs no network and no async runtime:
//! - The data model: alerts, propositions, decisions
//! - The rule-based static suggestion tables used as a degraded-path
//!   fallback
//! - The append-only decision log that later serves as labeled training
//!   data
//!
//! The fault-tolerant fetch pipeline itself (retries, circuit breaker,
//! HTTP) lives in `remedian-runtime`.

pub mod decision_log;
pub mod rules;
pub mod types;

pub use decision_log::{
    DecisionLogStore, FileLogStore, MemoryLogStore, PropositionLog, StoreError,
};
pub use rules::lookup_suggestions;
pub use types::{
    ActionKind, Alert, AlertCategory, Decision, Proposition, TypeError, MAX_SEVERITY,
    MIN_SEVERITY,
};
