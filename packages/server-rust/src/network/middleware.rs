//! HTTP middleware stack for the gatekeeper server.
//!
//! Transport-level layers applied to every route, gated or not. The gate
//! itself is attached per route in [`super::module`], inside this stack, so
//! its `gate` span nests under the `http` span carrying the request id, and
//! the request timeout covers the gatekeeper round trips.

use axum::extract::Request;
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use super::config::NetworkConfig;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wraps `router` in the HTTP-level middleware stack.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` unless the client sent one
/// 2. `Tracing` -- one `http` span per request, tagged with the request id
/// 3. `CORS` -- origins from configuration; any header, so `Authorization` passes
/// 4. `Timeout` -- 408 once `request_timeout` elapses
/// 5. `PropagateRequestId` -- echoes `X-Request-Id` on the response
pub fn apply_http_layers<S>(router: Router<S>, config: &NetworkConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(http_span))
            .layer(build_cors_layer(&config.cors_origins))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            ))
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

fn http_span(req: &Request) -> tracing::Span {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    info_span!(
        "http",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %request_id,
    )
}

/// A wildcard `"*"` allows any origin; otherwise unparseable entries are skipped.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
}
