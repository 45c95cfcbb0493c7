//! Middleware components for the VideoTube server.
//!
//! This module contains:
//! - Access token authentication (`AuthUser` extractor)
//! - Rate limiting for credential endpoints

pub mod auth;
pub mod rate_limit;

pub use auth::AuthUser;
pub use rate_limit::{RateLimiter, RateLimiterLayer};
