//! HTTP implementation of [`PropositionService`].
//!
//! Posts the alert payload to `/api/predictive_actions` on the configured
//! base URL and decodes the proposition list from the JSON response.

use super::{ApiCredential, PropositionRequest, PropositionResponse, PropositionService, ServiceError};
use async_trait::async_trait;
use remedian_core::{Alert, Proposition};
use serde::Deserialize;
use std::time::Duration;

/// Path of the proposition endpoint, relative to the base URL.
const PREDICTIVE_ACTIONS_PATH: &str = "/api/predictive_actions";

/// Error body shape returned by the predictive service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// Reqwest-backed predictive-service client.
pub struct HttpPropositionService {
    base_url: String,
    credential: Option<ApiCredential>,
    client: reqwest::Client,
    call_timeout: Duration,
}

impl HttpPropositionService {
    /// Build a client for the given base URL.
    ///
    /// `call_timeout` is the hard per-request deadline; the protected
    /// fetcher applies the same bound from outside, so either side failing
    /// first yields a timeout failure.
    pub fn new(base_url: impl Into<String>, call_timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential: None,
            client,
            call_timeout,
        })
    }

    /// Attach a bearer credential.
    pub fn with_credential(mut self, credential: ApiCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, PREDICTIVE_ACTIONS_PATH)
    }
}

#[async_trait]
impl PropositionService for HttpPropositionService {
    async fn fetch_propositions(
        &self,
        alert: &Alert,
        request_id: &str,
    ) -> Result<Vec<Proposition>, ServiceError> {
        let payload = PropositionRequest::from_alert(alert, request_id);

        let mut request = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .json(&payload);

        // Expose the credential only here, at the point of use.
        if let Some(credential) = &self.credential {
            request = request.bearer_auth(credential.expose());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.call_timeout)
            } else {
                ServiceError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: PropositionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;

        for proposition in &body.propositions {
            proposition
                .validate()
                .map_err(|e| ServiceError::Decode(e.to_string()))?;
        }

        Ok(body.propositions)
    }

    fn name(&self) -> &str {
        "predictive-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let service =
            HttpPropositionService::new("http://svc:8001/", Duration::from_secs(30)).unwrap();
        assert_eq!(service.endpoint(), "http://svc:8001/api/predictive_actions");
    }

    #[test]
    fn test_credential_not_in_debug_of_error() {
        let service = HttpPropositionService::new("http://svc:8001", Duration::from_secs(30))
            .unwrap()
            .with_credential(ApiCredential::new("tok-very-secret"));
        // The credential itself refuses to print.
        let debug = format!("{:?}", service.credential);
        assert!(!debug.contains("very-secret"));
    }
}
