//! Gatekeeper Core: token claims, gatekeeper wire payloads, and the
//! per-request context handed to gated handlers.

pub mod context;
pub mod messages;
pub mod types;

pub use context::RequestContext;
pub use messages::{ErrorBody, GatekeeperPayload, PolicyRequest, UsageRecord};
pub use types::{PolicyDecision, TokenClaims, REALM_CLAIM};
