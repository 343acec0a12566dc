//! Network module with deferred startup lifecycle.
//!
//! `new()` wires the gate and shared state, `start()` binds the TCP listener,
//! and `serve()` accepts connections until the shutdown future resolves, then
//! drains pending usage reports.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    health_handler, liveness_handler, question_handler, readiness_handler, root_handler, AppState,
};
use super::middleware::apply_http_layers;
use super::shutdown::ShutdownController;
use crate::gate::{Gate, GateLayer};

/// Owns the HTTP server lifecycle for the gated application.
///
/// 1. `new()` -- attaches the gate to the shutdown controller
/// 2. `start()` -- binds the TCP listener
/// 3. `serve()` -- serves until shutdown, then drains usage reports
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    gate: Arc<Gate>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, gate: Gate) -> Self {
        let shutdown = Arc::new(ShutdownController::new());
        let gate = Arc::new(gate.with_shutdown(Arc::clone(&shutdown)));
        Self {
            config,
            listener: None,
            gate,
            shutdown,
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router.
    ///
    /// Gated routes:
    /// - `GET /` -- hello, realm and validation
    /// - `GET /question`, `POST /question` -- realm, token payload and validation
    ///
    /// Open routes:
    /// - `GET /health`, `GET /health/live`, `GET /health/ready`
    pub fn build_router(&self) -> Router {
        build_router(&self.config, Arc::clone(&self.gate), Arc::clone(&self.shutdown))
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port (differs from the configured one when it is 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves, then waits up to
    /// `drain_timeout` for detached usage reports.
    ///
    /// # Errors
    ///
    /// Returns an error if the server hits a fatal I/O error or TLS material
    /// cannot be loaded.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        let shutdown_ctrl = self.shutdown;
        let config = self.config;

        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = config.tls {
            serve_tls(listener, router, tls_config, shutdown).await?;
        } else {
            serve_plain(listener, router, shutdown).await?;
        }

        drain_usage_reports(&shutdown_ctrl, &config).await;
        Ok(())
    }
}

fn build_router(
    config: &NetworkConfig,
    gate: Arc<Gate>,
    shutdown: Arc<ShutdownController>,
) -> Router {
    let state = AppState {
        shutdown,
        start_time: Instant::now(),
    };

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/question", get(question_handler).post(question_handler))
        .route_layer(GateLayer::new(gate))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler));

    apply_http_layers(router, config).with_state(state)
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Serving plain HTTP");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serves TLS using `axum-server` with rustls, reusing the pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

async fn drain_usage_reports(shutdown_ctrl: &ShutdownController, config: &NetworkConfig) {
    shutdown_ctrl.trigger_shutdown();

    let pending = shutdown_ctrl.in_flight_count();
    if pending > 0 {
        info!(pending, "Waiting for pending usage reports");
    }

    if shutdown_ctrl.wait_for_drain(config.drain_timeout).await {
        info!("Usage reports drained");
    } else {
        warn!(
            pending = shutdown_ctrl.in_flight_count(),
            "Drain timeout expired with usage reports still pending"
        );
    }
}
