//! Service layer for the VideoTube server.
//!
//! This module contains the business logic services that handle:
//! - Document storage and read-side joins (RocksDB)
//! - Token issuance and password hashing
//! - Media uploads to the configured host

pub mod auth;
pub mod database;
pub mod media;

pub use auth::AuthService;
pub use database::DatabaseService;
pub use media::MediaService;
