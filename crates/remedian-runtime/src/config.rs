//! Runtime configuration.
//!
//! Every knob carries the documented default, so `EngineConfig::default()`
//! is a working production configuration. Durations are serialized as whole
//! seconds to keep config files readable.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Retry delay schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    #[serde(with = "duration_secs")]
    pub initial_delay: Duration,

    /// Multiplier applied per attempt.
    pub exponential_base: f64,

    /// Hard cap on any single delay.
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,

    /// Sample the final delay uniformly from [delay/2, delay].
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            exponential_base: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,

    /// Consecutive half-open successes needed to close it again.
    pub success_threshold: u32,

    /// Time an open circuit waits before admitting a trial call.
    #[serde(with = "duration_secs")]
    pub breaker_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            breaker_timeout: Duration::from_secs(60),
        }
    }
}

/// Protected-fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Retries after the initial attempt; total attempts = max_retries + 1.
    pub max_retries: u32,

    /// Hard deadline for a single downstream call.
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            call_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Proposition cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,

    pub max_entries: u64,

    #[serde(with = "duration_secs")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// How long fetched propositions stay decidable.
    #[serde(default = "default_proposition_ttl", with = "duration_secs")]
    pub proposition_ttl: Duration,
}

fn default_proposition_ttl() -> Duration {
    Duration::from_secs(15 * 60)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            proposition_ttl: default_proposition_ttl(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.call_timeout, Duration::from_secs(30));
        assert_eq!(config.fetch.backoff.initial_delay, Duration::from_secs(1));
        assert_eq!(config.fetch.backoff.exponential_base, 2.0);
        assert_eq!(config.fetch.backoff.max_delay, Duration::from_secs(60));
        assert!(config.fetch.backoff.jitter);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.success_threshold, 2);
        assert_eq!(config.breaker.breaker_timeout, Duration::from_secs(60));
        assert_eq!(config.proposition_ttl, Duration::from_secs(900));
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = r#"
fetch:
  max_retries: 5
  call_timeout: 10
breaker:
  failure_threshold: 2
  success_threshold: 1
  breaker_timeout: 5
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.call_timeout, Duration::from_secs(10));
        assert_eq!(config.breaker.failure_threshold, 2);
        // Unspecified sections keep defaults.
        assert_eq!(config.fetch.backoff.exponential_base, 2.0);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_duration_serializes_as_seconds() {
        let config = CircuitBreakerConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["breaker_timeout"], 60);
    }
}
