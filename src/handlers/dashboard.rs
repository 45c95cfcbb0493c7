//! Channel dashboard for the signed-in user.

use axum::{extract::State, routing::get, Router};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, ChannelStats, VideoView};
use crate::state::AppState;

/// GET /api/v1/dashboard/stats
async fn channel_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<ChannelStats>> {
    let stats = state.db.channel_stats(auth.id())?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

/// All of the caller's videos, published or not
///
/// GET /api/v1/dashboard/videos
async fn channel_videos(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<VideoView<Uuid>>>> {
    let videos = state.db.channel_videos(auth.id())?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(channel_stats))
        .route("/videos", get(channel_videos))
}
