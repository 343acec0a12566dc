use async_trait::async_trait;
use gatekeeper_core::{PolicyDecision, PolicyRequest, UsageRecord};

use crate::gate::{GateError, UsageError};

/// Decides whether a tenant may perform a given call.
/// Implementations: HTTP gatekeeper client, in-process stubs (tests).
#[async_trait]
pub trait PolicyAuthority: Send + Sync {
    /// Validate a single call.
    ///
    /// Returns the decision payload on allow, [`GateError::PolicyDenied`] on an
    /// explicit deny, and [`GateError::PolicyCallFailed`] when no decision
    /// could be obtained.
    async fn validate(&self, request: &PolicyRequest) -> Result<PolicyDecision, GateError>;
}

/// Receives usage reports for calls that reached their handler.
/// Delivery is best-effort; callers log and drop errors.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Report one completed call.
    async fn record(&self, record: &UsageRecord) -> Result<(), UsageError>;
}
