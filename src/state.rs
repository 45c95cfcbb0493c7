//! Application state management.
//!
//! This module defines the shared application state that is accessible
//! from all request handlers via Axum's State extractor.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
//!     let video = state.db.get_video(id)?;
//!     // ...
//! }
//! ```

use crate::config::Config;
use crate::error::Result;
use crate::services::{AuthService, DatabaseService, MediaService};
use std::sync::Arc;

/// Shared application state
///
/// Every field is an `Arc`, so cloning the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Document store
    pub db: Arc<DatabaseService>,

    /// Configured media host
    pub media: Arc<MediaService>,

    /// Token signing and verification
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Create a new application state
    ///
    /// # Errors
    /// Returns error if the database or the media host cannot be initialized
    pub async fn new(config: Config) -> Result<Self> {
        let db = DatabaseService::new(&config.storage)?;
        let media = MediaService::new(&config).await?;
        let auth = AuthService::new(&config.auth);

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            media: Arc::new(media),
            auth: Arc::new(auth),
        })
    }

    /// Largest page a paginated endpoint returns
    pub fn max_page_size(&self) -> u32 {
        self.config.server.max_page_size
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("db", &self.db)
            .field("media", &self.media.provider_name())
            .field("auth", &self.auth)
            .finish()
    }
}
