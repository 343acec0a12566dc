//! Gatekeeper Server: bearer-token admission, gatekeeper policy validation,
//! and usage metering in front of axum handlers.

pub mod gate;
pub mod network;
pub mod telemetry;
pub mod traits;

pub use gate::{Gate, GateConfig, GateError, GateLayer, Gated, TokenVerification, UsageMode};
pub use network::{NetworkConfig, NetworkModule};
pub use traits::{PolicyAuthority, UsageSink};
