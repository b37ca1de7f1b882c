//! Core data model for the remediation pipeline.
//!
//! Alerts come in from monitoring surfaces (CI, spam/scam detection,
//! security tooling); propositions come back from the downstream predictive
//! service. Both are plain serde types: the runtime crate owns all
//! behavior around them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Severity bounds for an alert (inclusive).
pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

/// Errors constructing domain values.
#[derive(Error, Debug)]
pub enum TypeError {
    #[error("severity {0} out of range 1..=10")]
    SeverityOutOfRange(u8),

    #[error("confidence {0} out of range 0.0..=1.0")]
    ConfidenceOutOfRange(f64),
}

/// Category of an incoming alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    CiFailure,
    SpamIncident,
    ScamIncident,
    SecurityAlert,
}

impl AlertCategory {
    /// Stable wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::CiFailure => "ci_failure",
            AlertCategory::SpamIncident => "spam_incident",
            AlertCategory::ScamIncident => "scam_incident",
            AlertCategory::SecurityAlert => "security_alert",
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming operational event requiring possible remediation.
///
/// Immutable once created. Downstream records reference it by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Opaque caller-assigned identifier.
    pub id: String,

    pub category: AlertCategory,

    /// Severity in 1..=10, validated by [`Alert::new`].
    pub severity: u8,

    pub description: String,

    /// Free-form context forwarded to the predictive service.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Alert {
    /// Create an alert, validating the severity range.
    pub fn new(
        id: impl Into<String>,
        category: AlertCategory,
        severity: u8,
        description: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let alert = Self {
            id: id.into(),
            category,
            severity,
            description: description.into(),
            metadata: HashMap::new(),
        };
        alert.validate()?;
        Ok(alert)
    }

    /// Validate externally-supplied fields after decoding.
    pub fn validate(&self) -> Result<(), TypeError> {
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&self.severity) {
            return Err(TypeError::SeverityOutOfRange(self.severity));
        }
        Ok(())
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// What kind of action a proposition recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AutoFix,
    Review,
    Escalate,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::AutoFix => "auto_fix",
            ActionKind::Review => "review",
            ActionKind::Escalate => "escalate",
        };
        f.write_str(s)
    }
}

/// A recommended remediation action returned by the predictive service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposition {
    pub id: String,

    /// Back-reference to the alert this proposition answers.
    pub alert_id: String,

    pub action_kind: ActionKind,

    /// Model confidence in 0.0..=1.0.
    pub confidence: f64,

    /// Human-readable recommendation text.
    pub recommendation: String,

    /// Opaque execution parameters for the action executor.
    #[serde(default)]
    pub execution_details: HashMap<String, serde_json::Value>,
}

impl Proposition {
    /// Validate service-supplied fields after decoding.
    pub fn validate(&self) -> Result<(), TypeError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(TypeError::ConfidenceOutOfRange(self.confidence));
        }
        Ok(())
    }
}

/// Caller verdict on a proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected,
    Deferred,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Decision::Accepted => "accepted",
            Decision::Rejected => "rejected",
            Decision::Deferred => "deferred",
        };
        f.write_str(s)
    }
}
