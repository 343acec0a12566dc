//! Gatekeeper connection and usage dispatch configuration.

use std::time::Duration;

/// How the usage report is dispatched once the handler has responded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsageMode {
    /// Spawn the report on the runtime and return the response immediately.
    #[default]
    Detached,
    /// Await the report before returning the response.
    Inline,
}

/// Configuration for the gatekeeper collaborator.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Base URL of the gatekeeper service. Trailing slashes are ignored.
    pub gatekeeper_url: String,
    /// Path appended to the base URL for policy validation.
    pub validate_path: String,
    /// Path appended to the base URL for usage reports.
    pub usage_path: String,
    /// Upper bound on a single policy validation call.
    pub policy_timeout: Duration,
    /// Upper bound on a single usage report call.
    pub usage_timeout: Duration,
    /// Usage dispatch strategy.
    pub usage_mode: UsageMode,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            gatekeeper_url: "http://localhost:8082/gatekeeper".to_string(),
            validate_path: "/validate".to_string(),
            usage_path: "/usage".to_string(),
            policy_timeout: Duration::from_secs(10),
            usage_timeout: Duration::from_secs(5),
            usage_mode: UsageMode::Detached,
        }
    }
}

impl GateConfig {
    /// Base URL with trailing slashes removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.gatekeeper_url.trim_end_matches('/')
    }

    /// Full URL of the validate endpoint.
    #[must_use]
    pub fn validate_url(&self) -> String {
        join_url(self.base_url(), &self.validate_path)
    }

    /// Full URL of the usage endpoint.
    #[must_use]
    pub fn usage_url(&self) -> String {
        join_url(self.base_url(), &self.usage_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{base}/{}", path.trim_start_matches('/'))
}
