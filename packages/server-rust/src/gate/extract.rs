//! Axum extractor handing the admitted request context to handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gatekeeper_core::RequestContext;

use super::error::GateError;

/// Context attached by [`GateLayer`](super::GateLayer) for the current request.
///
/// Handlers take this as an explicit parameter instead of reading ambient
/// request state. On a route the gate does not cover, extraction fails with
/// [`GateError::MissingContext`] (500).
#[derive(Debug, Clone)]
pub struct Gated(pub RequestContext);

impl<S> FromRequestParts<S> for Gated
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(Gated)
            .ok_or(GateError::MissingContext)
    }
}
