//! HTTP middleware applied to the whole router
//!
//! Authentication lives in [`crate::auth::middleware`]; these layers handle
//! response shaping, security headers and request metrics.

pub mod hide_secrets;
pub mod metrics;
pub mod security_headers;

pub use hide_secrets::hide_secrets_middleware;
pub use metrics::{metrics_middleware, UNMATCHED_ENDPOINT};
pub use security_headers::security_headers_middleware;
