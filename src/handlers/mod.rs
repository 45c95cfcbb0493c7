//! HTTP request handlers, one module per resource:
//! - `users`: registration, sessions, profile and account management
//! - `videos`: upload, listing, details and publishing
//! - `subscriptions`, `comments`, `likes`, `playlists`, `tweets`
//! - `dashboard`: channel statistics for the caller
//! - `health`: liveness and readiness probes

pub mod comments;
pub mod dashboard;
pub mod extract;
pub mod health;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

pub use comments::comment_routes;
pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use likes::like_routes;
pub use playlists::playlist_routes;
pub use subscriptions::subscription_routes;
pub use tweets::tweet_routes;
pub use users::user_routes;
pub use videos::video_routes;

use uuid::Uuid;

use crate::error::{AppError, Result};

/// 403 unless `user` owns the resource
pub(crate) fn ensure_owner(owner: Uuid, user: Uuid, resource: &str) -> Result<()> {
    if owner == user {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "You are not allowed to modify this {}",
            resource
        )))
    }
}
