//! Tower layer that runs the admission pipeline around a handler.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use gatekeeper_core::UsageRecord;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use super::pipeline::Gate;

// ---------------------------------------------------------------------------
// GateLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps handlers with token and gatekeeper admission.
///
/// Apply with `Router::route_layer` so only matched routes are gated.
#[derive(Clone)]
pub struct GateLayer {
    gate: Arc<Gate>,
}

impl GateLayer {
    #[must_use]
    pub fn new(gate: Arc<Gate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GateService {
            inner,
            gate: Arc::clone(&self.gate),
        }
    }
}

// ---------------------------------------------------------------------------
// GateService
// ---------------------------------------------------------------------------

/// Service wrapper driving one request through the admission state machine.
///
/// Rejections short-circuit with the matching JSON error response. Admitted
/// requests get a [`gatekeeper_core::RequestContext`] in their extensions; the
/// handler's response is returned untouched and usage is reported afterwards,
/// whether the handler succeeded or not.
#[derive(Clone)]
pub struct GateService<S> {
    inner: S,
    gate: Arc<Gate>,
}

impl<S> Service<Request> for GateService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Move the readied service into the future; keep a clone for the next call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = Arc::clone(&self.gate);

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let span = info_span!(
            "gate",
            method = %method,
            path = %path,
            realm = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let (mut parts, body) = req.into_parts();

                let ctx = match gate.admit(&parts.headers, &method, &path).await {
                    Ok(ctx) => ctx,
                    Err(e) => {
                        tracing::Span::current().record("outcome", e.outcome());
                        return Ok(e.into_response());
                    }
                };

                tracing::Span::current().record("realm", ctx.realm.as_str());
                let record = UsageRecord::new(ctx.realm.as_str(), method.as_str(), path);
                parts.extensions.insert(ctx);

                let response = inner.call(Request::from_parts(parts, body)).await?;

                gate.report_usage(record).await;
                tracing::Span::current().record("outcome", "usage_dispatched");

                Ok(response)
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
