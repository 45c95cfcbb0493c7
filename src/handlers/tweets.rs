//! Short text posts.
//!
//! - `POST /api/v1/tweets` `{ content }`
//! - `GET /api/v1/tweets/user/{userId}`
//! - `PATCH /api/v1/tweets/{tweetId}` `{ content }`
//! - `DELETE /api/v1/tweets/{tweetId}`

use axum::{
    extract::State,
    routing::{get, patch, post},
    Router,
};
use uuid::Uuid;

use super::ensure_owner;
use super::extract::{ApiJson, ApiPath};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, ContentRequest, Empty, LikeTarget, Tweet, TweetView};
use crate::state::AppState;

fn owned_tweet(state: &AppState, id: Uuid, user: Uuid) -> Result<Tweet> {
    let tweet = state
        .db
        .get_tweet(id)?
        .ok_or_else(|| AppError::not_found("Tweet not found"))?;
    ensure_owner(tweet.owner, user, "tweet")?;
    Ok(tweet)
}

/// POST /api/v1/tweets
async fn create_tweet(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ContentRequest>,
) -> Result<ApiResponse<TweetView>> {
    let content = body
        .content()
        .ok_or_else(|| AppError::validation("Tweet content is required"))?;

    let tweet = Tweet::new(content, auth.id());
    state.db.insert_tweet(&tweet)?;

    Ok(ApiResponse::created(
        tweet.view(auth.user.summary(), 0, false),
        "Tweet created successfully",
    ))
}

/// GET /api/v1/tweets/user/{userId}
async fn user_tweets(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<TweetView>>> {
    state
        .db
        .get_user(user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let tweets = state.db.tweet_views(user_id, auth.id())?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

/// PATCH /api/v1/tweets/{tweetId}
async fn update_tweet(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(tweet_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ContentRequest>,
) -> Result<ApiResponse<TweetView>> {
    let content = body
        .content()
        .ok_or_else(|| AppError::validation("Tweet content is required"))?;

    owned_tweet(&state, tweet_id, auth.id())?;
    let tweet = state.db.modify_tweet(tweet_id, |tweet| {
        tweet.content = content;
        tweet.touch();
        Ok(tweet.clone())
    })?;

    let target = LikeTarget::Tweet(tweet.id);
    let view = tweet.view(
        auth.user.summary(),
        state.db.count_likes(target)?,
        state.db.is_liked_by(target, auth.id())?,
    );
    Ok(ApiResponse::ok(view, "Tweet updated successfully"))
}

/// DELETE /api/v1/tweets/{tweetId}
async fn delete_tweet(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(tweet_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Empty>> {
    owned_tweet(&state, tweet_id, auth.id())?;
    state.db.delete_tweet(tweet_id)?;
    Ok(ApiResponse::ok(Empty::default(), "Tweet deleted successfully"))
}

pub fn tweet_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tweet))
        .route("/user/{user_id}", get(user_tweets))
        .route("/{tweet_id}", patch(update_tweet).delete(delete_tweet))
}
