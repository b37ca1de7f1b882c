//! Downstream predictive-service abstraction.
//!
//! The protected fetcher only ever talks to [`PropositionService`]; the
//! HTTP implementation lives in [`http`], and tests substitute stubs.

use async_trait::async_trait;
use remedian_core::{Alert, Proposition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub mod http;
pub mod secrets;

pub use http::HttpPropositionService;
pub use secrets::ApiCredential;

/// Failures calling the predictive service.
///
/// All variants count as a failure for circuit-breaker purposes; decode
/// failures are retried exactly like transport failures.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("service credential missing: {0}")]
    NotConfigured(String),
}

/// Request payload sent to the predictive service.
#[derive(Debug, Serialize)]
pub struct PropositionRequest<'a> {
    pub request_id: &'a str,
    pub alert_id: &'a str,
    pub category: &'a str,
    pub severity: u8,
    pub description: &'a str,
    pub metadata: &'a HashMap<String, serde_json::Value>,
}

impl<'a> PropositionRequest<'a> {
    pub fn from_alert(alert: &'a Alert, request_id: &'a str) -> Self {
        Self {
            request_id,
            alert_id: &alert.id,
            category: alert.category.as_str(),
            severity: alert.severity,
            description: &alert.description,
            metadata: &alert.metadata,
        }
    }
}

/// Response body from the predictive service.
#[derive(Debug, Deserialize)]
pub struct PropositionResponse {
    pub propositions: Vec<Proposition>,
}

/// A source of remediation propositions for an alert.
#[async_trait]
pub trait PropositionService: Send + Sync {
    /// Fetch propositions for one alert. One network call, no retries;
    /// the protected fetcher owns the retry policy.
    async fn fetch_propositions(
        &self,
        alert: &Alert,
        request_id: &str,
    ) -> Result<Vec<Proposition>, ServiceError>;

    /// Service name for logs.
    fn name(&self) -> &str;
}
