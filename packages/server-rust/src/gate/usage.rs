//! HTTP client for the gatekeeper's usage endpoint.

use async_trait::async_trait;
use gatekeeper_core::UsageRecord;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::config::GateConfig;
use super::error::UsageError;
use crate::traits::UsageSink;

/// Posts one [`UsageRecord`] per call to `POST {base}/usage`.
#[derive(Debug, Clone)]
pub struct HttpUsageRecorder {
    client: Client,
    usage_url: String,
    timeout: std::time::Duration,
}

impl HttpUsageRecorder {
    /// Builds a usage recorder sharing the given HTTP connection pool.
    #[must_use]
    pub fn new(client: Client, config: &GateConfig) -> Self {
        Self {
            client,
            usage_url: config.usage_url(),
            timeout: config.usage_timeout,
        }
    }
}

#[async_trait]
impl UsageSink for HttpUsageRecorder {
    async fn record(&self, record: &UsageRecord) -> Result<(), UsageError> {
        debug!(
            realm = %record.organization_name,
            method = %record.method,
            path = %record.path,
            "recording usage"
        );

        let body = serde_json::to_vec(record).map_err(|e| UsageError::Encode(e.to_string()))?;

        let response = self
            .client
            .post(&self.usage_url)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| UsageError::Transport(e.to_string()))?;

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(status = status.as_u16(), error = %e, "usage response body unreadable");
                None
            }
        };

        if status != StatusCode::OK {
            return Err(UsageError::Rejected {
                status: status.as_u16(),
                body: text.unwrap_or_default(),
            });
        }

        match text {
            Some(text) => debug!(response = %text, "usage recorded"),
            None => debug!("usage recorded; response body unreadable"),
        }
        Ok(())
    }
}
