//! Gatekeeper server binary: demo routes behind token and gatekeeper admission.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gatekeeper_server::gate::{Gate, GateConfig, TokenVerification, UsageMode};
use gatekeeper_server::network::{NetworkConfig, NetworkModule, TlsConfig};
use gatekeeper_server::telemetry::{init_tracing, LogFormat};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum UsageModeArg {
    Detached,
    Inline,
}

impl From<UsageModeArg> for UsageMode {
    fn from(arg: UsageModeArg) -> Self {
        match arg {
            UsageModeArg::Detached => UsageMode::Detached,
            UsageModeArg::Inline => UsageMode::Inline,
        }
    }
}

/// Command-line and environment configuration.
#[derive(Parser, Debug)]
#[command(name = "gatekeeper-server", version, about)]
struct Cli {
    /// Base URL of the gatekeeper service.
    #[arg(long, env = "GATEKEEPER_URL", default_value = "http://localhost:8082/gatekeeper")]
    gatekeeper_url: String,

    /// Bind address.
    #[arg(long, env = "GATE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port.
    #[arg(long, env = "GATE_PORT", default_value_t = 8000)]
    port: u16,

    /// Timeout for one gatekeeper validation call, in milliseconds.
    #[arg(long, env = "GATE_POLICY_TIMEOUT_MS", default_value_t = 10_000)]
    policy_timeout_ms: u64,

    /// Timeout for one usage report, in milliseconds.
    #[arg(long, env = "GATE_USAGE_TIMEOUT_MS", default_value_t = 5_000)]
    usage_timeout_ms: u64,

    /// Usage endpoint path relative to the gatekeeper URL.
    #[arg(long, env = "GATE_USAGE_PATH", default_value = "/usage")]
    usage_path: String,

    /// Whether usage reports are awaited before responding.
    #[arg(long, value_enum, env = "GATE_USAGE_MODE", default_value = "detached")]
    usage_mode: UsageModeArg,

    /// HS256 secret used to verify inbound tokens.
    #[arg(long, env = "GATE_JWT_SECRET", hide_env_values = true, conflicts_with = "jwt_rsa_public_key")]
    jwt_hs256_secret: Option<String>,

    /// Path to a PEM RSA public key used to verify inbound RS256 tokens.
    #[arg(long, env = "GATE_JWT_RSA_PUBLIC_KEY")]
    jwt_rsa_public_key: Option<PathBuf>,

    /// Required `iss` claim when verification is enabled.
    #[arg(long, env = "GATE_JWT_ISSUER")]
    jwt_issuer: Option<String>,

    /// Allowed CORS origin; repeat for several. Defaults to any.
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Overall request timeout, in milliseconds.
    #[arg(long, env = "GATE_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    request_timeout_ms: u64,

    /// TLS certificate chain (PEM). Requires --tls-key.
    #[arg(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// TLS private key (PEM). Requires --tls-cert.
    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, env = "GATE_LOG_FORMAT", default_value = "plain")]
    log_format: LogFormat,
}

impl Cli {
    fn gate_config(&self) -> GateConfig {
        GateConfig {
            gatekeeper_url: self.gatekeeper_url.clone(),
            usage_path: self.usage_path.clone(),
            policy_timeout: Duration::from_millis(self.policy_timeout_ms),
            usage_timeout: Duration::from_millis(self.usage_timeout_ms),
            usage_mode: self.usage_mode.into(),
            ..GateConfig::default()
        }
    }

    fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };

        let defaults = NetworkConfig::default();
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            cors_origins: if self.cors_origins.is_empty() {
                defaults.cors_origins
            } else {
                self.cors_origins.clone()
            },
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..defaults
        }
    }

    fn token_verification(&self) -> anyhow::Result<TokenVerification> {
        if let Some(secret) = &self.jwt_hs256_secret {
            return Ok(TokenVerification::hs256(
                secret.as_bytes(),
                self.jwt_issuer.clone(),
            ));
        }
        if let Some(path) = &self.jwt_rsa_public_key {
            let pem = std::fs::read(path)
                .with_context(|| format!("reading RSA public key {}", path.display()))?;
            return TokenVerification::rs256_pem(&pem, self.jwt_issuer.clone())
                .context("parsing RSA public key");
        }
        if self.jwt_issuer.is_some() {
            warn!("--jwt-issuer has no effect without a verification key");
        }
        Ok(TokenVerification::Unverified)
    }
}

async fn shutdown_signal() {
    await_signal(tokio::signal::ctrl_c()).await;
}

/// Resolves when `signal` fires; never resolves if the listener failed to install.
async fn await_signal<E: std::fmt::Display>(signal: impl Future<Output = Result<(), E>>) {
    if let Err(e) = signal.await {
        warn!(error = %e, "failed to listen for ctrl-c; serving until the process is killed");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c, shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let gate_config = cli.gate_config();
    let verification = cli.token_verification()?;
    info!(
        gatekeeper = %gate_config.base_url(),
        verified = verification.is_verified(),
        usage_mode = ?gate_config.usage_mode,
        "starting gatekeeper server"
    );

    let client = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;
    let gate = Gate::http(&gate_config, verification, &client);

    let mut module = NetworkModule::new(cli.network_config(), gate);
    module.start().await?;
    module.serve(shutdown_signal()).await
}
