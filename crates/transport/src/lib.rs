//! Downstream transport: the pure, framework-agnostic pipeline
//! functions the gateway's axum WS handler calls in order — rate limit,
//! sanitize, validate. No axum dependency here; HTTP/WS extraction and
//! CORS stay in `vsg-gateway`.

pub mod rate_limit;
pub mod sanitize;
pub mod validate;

pub use rate_limit::{RateLimitOutcome, RateLimiter};
pub use sanitize::{sanitize_text, SanitizeOutcome};
pub use validate::validate_client_event;
