//! Middleware for the Web API.

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::AuthKey;
pub use cors::create_cors_layer;
pub use rate_limit::{ip_rate_limit, IpRateLimitState};
