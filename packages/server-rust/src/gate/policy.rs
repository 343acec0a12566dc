//! HTTP client for the gatekeeper's validate endpoint.

use async_trait::async_trait;
use gatekeeper_core::{PolicyDecision, PolicyRequest};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::config::GateConfig;
use super::error::GateError;
use crate::traits::PolicyAuthority;

/// Calls `POST {base}/validate` once per request.
///
/// 200 with a JSON body allows the call; any other status denies it. Transport
/// failures, timeouts and unparseable bodies are reported separately from
/// denies. No retries.
#[derive(Debug, Clone)]
pub struct HttpPolicyClient {
    client: Client,
    validate_url: String,
    timeout: std::time::Duration,
}

impl HttpPolicyClient {
    /// Builds a policy client sharing the given HTTP connection pool.
    #[must_use]
    pub fn new(client: Client, config: &GateConfig) -> Self {
        Self {
            client,
            validate_url: config.validate_url(),
            timeout: config.policy_timeout,
        }
    }
}

#[async_trait]
impl PolicyAuthority for HttpPolicyClient {
    async fn validate(&self, request: &PolicyRequest) -> Result<PolicyDecision, GateError> {
        debug!(
            realm = %request.organization_name,
            method = %request.method,
            path = %request.path,
            "calling gatekeeper"
        );

        let response = self
            .client
            .post(&self.validate_url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "gatekeeper validation error");
                GateError::PolicyCallFailed(e.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                realm = %request.organization_name,
                status = status.as_u16(),
                "gatekeeper denied request"
            );
            return Err(GateError::PolicyDenied {
                status: status.as_u16(),
            });
        }

        let decision = response.json::<Value>().await.map_err(|e| {
            error!(error = %e, "gatekeeper returned an unreadable decision");
            GateError::PolicyCallFailed(e.to_string())
        })?;

        Ok(PolicyDecision(decision))
    }
}
