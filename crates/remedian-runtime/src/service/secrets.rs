//! Secure handling of the predictive-service credential.
//!
//! The bearer token is wrapped in [`secrecy::SecretString`] so it cannot
//! leak through `Debug` output or error messages; it must be explicitly
//! exposed at the single point of use.

use super::ServiceError;
use secrecy::{ExposeSecret, SecretString};

/// A service credential that redacts itself everywhere except `expose()`.
pub struct ApiCredential {
    secret: SecretString,
}

impl std::fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredential")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl ApiCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(token.into()),
        }
    }

    /// Read the credential from an environment variable.
    pub fn from_env(var: &str) -> Result<Self, ServiceError> {
        let token = std::env::var(var)
            .map_err(|_| ServiceError::NotConfigured(format!("{var} is not set")))?;
        Ok(Self::new(token))
    }

    /// Expose the raw token. Call only at the point of use.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.secret.expose_secret().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_is_redacted() {
        let credential = ApiCredential::new("tok-super-secret-1234567890");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_expose_returns_token() {
        let credential = ApiCredential::new("tok-abc");
        assert_eq!(credential.expose(), "tok-abc");
        assert!(!credential.is_empty());
        assert!(ApiCredential::new("").is_empty());
    }

    #[test]
    fn test_from_env_missing_is_not_configured() {
        let result = ApiCredential::from_env("REMEDIAN_TEST_UNSET_VAR");
        assert!(matches!(result, Err(ServiceError::NotConfigured(_))));
    }
}
