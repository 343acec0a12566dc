//! Server lifecycle state and pending usage-report tracking.
//!
//! Detached usage reports outlive the response that triggered them. Each one
//! holds a [`PendingGuard`] so shutdown can wait for them to finish instead of
//! dropping metering data on the floor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

/// Server health state.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Ready,
    /// Listener closed; pending usage reports are being flushed.
    Draining,
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Coordinates readiness reporting and the post-shutdown usage drain.
#[derive(Debug)]
pub struct ShutdownController {
    pending: Arc<AtomicU64>,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Arc::new(AtomicU64::new(0)),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    /// Moves to `Draining`; readiness probes start failing.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Registers one pending usage report. Released when the guard drops,
    /// including when the report task panics.
    #[must_use]
    pub fn in_flight_guard(&self) -> PendingGuard {
        self.pending.fetch_add(1, Ordering::Relaxed);
        PendingGuard {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Number of usage reports still running.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Waits until no usage reports are pending, up to `timeout`.
    ///
    /// Returns `true` and transitions to `Stopped` on a clean drain. Returns
    /// `false` on timeout, leaving the state unchanged.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.pending.load(Ordering::Relaxed) == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII handle for one pending usage report.
#[derive(Debug)]
pub struct PendingGuard {
    pending: Arc<AtomicU64>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::Relaxed);
    }
}
