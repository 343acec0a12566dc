//! Admission pipeline: token check, policy check, and usage dispatch.
//!
//! Per request the stages run strictly in order:
//!
//! 1. token extraction -> 401 on failure
//! 2. gatekeeper validation -> 403 (deny) or 500 (call failure)
//! 3. downstream handler (driven by [`GateService`](super::GateService))
//! 4. usage report, whose outcome never reaches the client
//!
//! Stages 2 and 4 are the only points that wait on external I/O.

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use gatekeeper_core::{PolicyRequest, RequestContext, UsageRecord};
use reqwest::Client;
use tracing::{error, warn, Instrument};

use super::config::{GateConfig, UsageMode};
use super::error::{GateError, UsageError};
use super::policy::HttpPolicyClient;
use super::token::{TokenExtractor, TokenVerification};
use super::usage::HttpUsageRecorder;
use crate::network::ShutdownController;
use crate::traits::{PolicyAuthority, UsageSink};

/// Shared, request-independent pipeline state.
///
/// Holds no per-request data; every request builds its own
/// [`RequestContext`], so one `Gate` serves any number of concurrent requests.
pub struct Gate {
    extractor: TokenExtractor,
    policy: Arc<dyn PolicyAuthority>,
    usage: Arc<dyn UsageSink>,
    usage_mode: UsageMode,
    shutdown: Option<Arc<ShutdownController>>,
}

impl Gate {
    /// Creates a gate from explicit collaborators. Usage is dispatched detached.
    #[must_use]
    pub fn new(
        extractor: TokenExtractor,
        policy: Arc<dyn PolicyAuthority>,
        usage: Arc<dyn UsageSink>,
    ) -> Self {
        Self {
            extractor,
            policy,
            usage,
            usage_mode: UsageMode::Detached,
            shutdown: None,
        }
    }

    /// Creates a gate talking to the configured gatekeeper over HTTP.
    ///
    /// Both collaborators share `client`'s connection pool.
    #[must_use]
    pub fn http(config: &GateConfig, verification: TokenVerification, client: &Client) -> Self {
        Self::new(
            TokenExtractor::new(verification),
            Arc::new(HttpPolicyClient::new(client.clone(), config)),
            Arc::new(HttpUsageRecorder::new(client.clone(), config)),
        )
        .with_usage_mode(config.usage_mode)
    }

    #[must_use]
    pub fn with_usage_mode(mut self, mode: UsageMode) -> Self {
        self.usage_mode = mode;
        self
    }

    /// Tracks detached usage reports as in-flight work so graceful shutdown
    /// waits for them.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Arc<ShutdownController>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    #[must_use]
    pub fn usage_mode(&self) -> UsageMode {
        self.usage_mode
    }

    /// Runs both admission checks and builds the handler context.
    ///
    /// The policy check runs only after the token check succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first [`GateError`] encountered; later stages are skipped.
    pub async fn admit(
        &self,
        headers: &HeaderMap,
        method: &Method,
        path: &str,
    ) -> Result<RequestContext, GateError> {
        let claims = self.extractor.extract(headers)?;

        let request = PolicyRequest::new(claims.realm.as_str(), method.as_str(), path);
        let decision = self.policy.validate(&request).await?;

        Ok(RequestContext::new(claims, decision))
    }

    /// Reports usage for a call that reached its handler.
    ///
    /// Never fails: errors are logged and dropped. In [`UsageMode::Detached`]
    /// this returns as soon as the report task is spawned.
    pub async fn report_usage(&self, record: UsageRecord) {
        match self.usage_mode {
            UsageMode::Inline => record_usage(self.usage.as_ref(), &record).await,
            UsageMode::Detached => {
                let usage = Arc::clone(&self.usage);
                let guard = self.shutdown.as_ref().map(|s| s.in_flight_guard());
                tokio::spawn(
                    async move {
                        record_usage(usage.as_ref(), &record).await;
                        drop(guard);
                    }
                    .in_current_span(),
                );
            }
        }
    }
}

async fn record_usage(sink: &dyn UsageSink, record: &UsageRecord) {
    match sink.record(record).await {
        Ok(()) => {}
        Err(e @ UsageError::Rejected { .. }) => warn!(error = %e, "usage recording failed"),
        Err(e) => error!(error = %e, "usage recorder error"),
    }
}
