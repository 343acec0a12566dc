//! Wire payloads exchanged with the gatekeeper service and returned to clients.

use serde::{Deserialize, Serialize};

/// Body sent to the gatekeeper's validate and usage endpoints.
///
/// Both endpoints accept the same `{organization_name, method, path}` shape;
/// the aliases below keep call sites readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatekeeperPayload {
    /// Tenant identifier taken from the token's `realm` claim.
    pub organization_name: String,
    /// HTTP method of the intercepted request, upper-case.
    pub method: String,
    /// URL path of the intercepted request, without the query string.
    pub path: String,
}

impl GatekeeperPayload {
    #[must_use]
    pub fn new(
        organization_name: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            organization_name: organization_name.into(),
            method: method.into(),
            path: path.into(),
        }
    }
}

/// Authorization query for a single call.
pub type PolicyRequest = GatekeeperPayload;

/// Metering notification for a call that reached its handler.
pub type UsageRecord = GatekeeperPayload;

/// Client-visible error body: `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
