//! Admission and usage error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gatekeeper_core::ErrorBody;

/// Rejections produced by the admission pipeline.
///
/// Every variant maps to exactly one client-visible status and `detail`
/// string; the `Display` text is the detail sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// No `Authorization` header, non-UTF-8 value, or a scheme other than `Bearer `.
    #[error("Missing or invalid auth token")]
    MissingToken,
    /// The credential could not be decoded (or failed verification).
    #[error("Invalid token: {0}")]
    MalformedToken(String),
    /// The token decoded but carries no usable `realm` claim.
    #[error("Invalid token: Missing 'realm'")]
    MissingRealm,
    /// The gatekeeper answered with a non-200 status. The upstream status is
    /// kept for logs only.
    #[error("Unauthorized by gatekeeper")]
    PolicyDenied { status: u16 },
    /// The gatekeeper could not be reached or returned an unparseable body.
    #[error("Gatekeeper validation failed: {0}")]
    PolicyCallFailed(String),
    /// A handler asked for the request context on a route the gate does not cover.
    #[error("Request context unavailable")]
    MissingContext,
}

impl GateError {
    /// HTTP status returned to the client for this rejection.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::MalformedToken(_) | Self::MissingRealm => {
                StatusCode::UNAUTHORIZED
            }
            Self::PolicyDenied { .. } => StatusCode::FORBIDDEN,
            Self::PolicyCallFailed(_) | Self::MissingContext => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for the terminal pipeline state, recorded on the request span.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "rejected_401",
            StatusCode::FORBIDDEN => "rejected_403",
            _ => "rejected_500",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

/// Failures while reporting usage. Logged by the pipeline, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("usage endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("usage request failed: {0}")]
    Transport(String),
    #[error("usage payload could not be encoded: {0}")]
    Encode(String),
}
