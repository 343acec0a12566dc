use serde_json::{Map, Value};

use crate::types::{PolicyDecision, TokenClaims};

/// Per-request context produced by the admission pipeline.
///
/// Built once after both admission checks pass and handed to the downstream
/// handler read-only. Never shared across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Tenant identifier from the token's `realm` claim.
    pub realm: String,
    /// Full decoded claim set.
    pub token_payload: Map<String, Value>,
    /// Decision payload returned by the gatekeeper.
    pub validation: PolicyDecision,
}

impl RequestContext {
    #[must_use]
    pub fn new(claims: TokenClaims, validation: PolicyDecision) -> Self {
        Self {
            realm: claims.realm,
            token_payload: claims.payload,
            validation,
        }
    }
}
