//! Request admission against the gatekeeper service.
//!
//! - [`token`]: bearer credential extraction and claim decoding
//! - [`policy`]: HTTP client for the gatekeeper's validate endpoint
//! - [`usage`]: HTTP client for the gatekeeper's usage endpoint
//! - [`pipeline`]: stage orchestration shared by all requests
//! - [`layer`]: Tower layer running the pipeline around handlers
//! - [`extract`]: axum extractor exposing the admitted context

pub mod config;
pub mod error;
pub mod extract;
pub mod layer;
pub mod pipeline;
pub mod policy;
pub mod token;
pub mod usage;

pub use config::{GateConfig, UsageMode};
pub use error::{GateError, UsageError};
pub use extract::Gated;
pub use layer::{GateLayer, GateService};
pub use pipeline::Gate;
pub use policy::HttpPolicyClient;
pub use token::{TokenExtractor, TokenVerification};
pub use usage::HttpUsageRecorder;
