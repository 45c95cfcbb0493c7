//! Likes on videos, comments and tweets.
//!
//! - `POST /api/v1/likes/toggle/v/{videoId}`
//! - `POST /api/v1/likes/toggle/c/{commentId}`
//! - `POST /api/v1/likes/toggle/t/{tweetId}`
//! - `GET /api/v1/likes/videos` - videos the caller liked

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::extract::ApiPath;
use super::videos::visible_video;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, LikeStatus, LikeTarget, UserSummary, VideoView};
use crate::state::AppState;

/// Toggle the caller's like once the target is known to exist
fn toggle(state: &AppState, target: LikeTarget, user: Uuid) -> Result<ApiResponse<LikeStatus>> {
    let is_liked = state.db.toggle_like(target, user)?;
    let message = if is_liked { "Liked" } else { "Like removed" };
    Ok(ApiResponse::ok(LikeStatus { is_liked }, message))
}

/// POST /api/v1/likes/toggle/v/{videoId}
async fn toggle_video_like(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> Result<ApiResponse<LikeStatus>> {
    visible_video(&state, video_id, auth.id())?;
    toggle(&state, LikeTarget::Video(video_id), auth.id())
}

/// POST /api/v1/likes/toggle/c/{commentId}
async fn toggle_comment_like(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(comment_id): ApiPath<Uuid>,
) -> Result<ApiResponse<LikeStatus>> {
    state
        .db
        .get_comment(comment_id)?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    toggle(&state, LikeTarget::Comment(comment_id), auth.id())
}

/// POST /api/v1/likes/toggle/t/{tweetId}
async fn toggle_tweet_like(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(tweet_id): ApiPath<Uuid>,
) -> Result<ApiResponse<LikeStatus>> {
    state
        .db
        .get_tweet(tweet_id)?
        .ok_or_else(|| AppError::not_found("Tweet not found"))?;
    toggle(&state, LikeTarget::Tweet(tweet_id), auth.id())
}

/// GET /api/v1/likes/videos
async fn liked_videos(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<VideoView<UserSummary>>>> {
    let videos = state.db.liked_videos(auth.id())?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}

pub fn like_routes() -> Router<AppState> {
    Router::new()
        .route("/toggle/v/{video_id}", post(toggle_video_like))
        .route("/toggle/c/{comment_id}", post(toggle_comment_like))
        .route("/toggle/t/{tweet_id}", post(toggle_tweet_like))
        .route("/videos", get(liked_videos))
}
