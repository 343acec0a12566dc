//! HTTP handler definitions for the gatekeeper server.
//!
//! `AppState` is the shared state carried through axum extractors. Gated
//! handlers do not use it; they read the admitted context via
//! [`crate::gate::Gated`].

pub mod echo;
pub mod health;

pub use echo::{question_handler, root_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;

/// Shared application state passed to operational handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle state and pending usage-report count.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
