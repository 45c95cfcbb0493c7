//! Channel subscriptions.
//!
//! - `POST /api/v1/subscriptions/{channelId}/subscribe`
//! - `POST /api/v1/subscriptions/{channelId}/unsubscribe`
//! - `GET /api/v1/subscriptions` - channels the caller follows
//! - `GET /api/v1/subscriptions/c/{channelId}` - a channel's subscribers

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

use super::extract::ApiPath;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{ApiResponse, ChannelSummary, Subscription, SubscriptionStatus, UserSummary};
use crate::state::AppState;

fn ensure_channel(state: &AppState, channel: Uuid) -> Result<()> {
    state
        .db
        .get_user(channel)?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Channel not found"))
}

/// POST /api/v1/subscriptions/{channelId}/subscribe
async fn subscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(channel): ApiPath<Uuid>,
) -> Result<ApiResponse<SubscriptionStatus>> {
    ensure_channel(&state, channel)?;
    if channel == auth.id() {
        return Err(AppError::validation("You cannot subscribe to your own channel"));
    }

    if !state
        .db
        .insert_subscription(&Subscription::new(auth.id(), channel))?
    {
        return Err(AppError::validation(
            "User already subscribed to this channel",
        ));
    }

    info!(subscriber = %auth.id(), channel = %channel, "Subscribed");

    Ok(ApiResponse::ok(
        SubscriptionStatus { is_subscribed: true },
        "Subscribed successfully",
    ))
}

/// POST /api/v1/subscriptions/{channelId}/unsubscribe
async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(channel): ApiPath<Uuid>,
) -> Result<ApiResponse<SubscriptionStatus>> {
    if !state.db.delete_subscription(auth.id(), channel)? {
        return Err(AppError::validation("Channel not subscribed"));
    }

    Ok(ApiResponse::ok(
        SubscriptionStatus {
            is_subscribed: false,
        },
        "Unsubscribed successfully",
    ))
}

/// GET /api/v1/subscriptions
async fn subscribed_channels(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<ChannelSummary>>> {
    let channels = state.db.subscribed_channels(auth.id())?;
    Ok(ApiResponse::ok(
        channels,
        "Subscribed channels fetched successfully",
    ))
}

/// GET /api/v1/subscriptions/c/{channelId}
async fn channel_subscribers(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(channel): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<UserSummary>>> {
    ensure_channel(&state, channel)?;
    let subscribers = state.db.channel_subscribers(channel)?;
    Ok(ApiResponse::ok(
        subscribers,
        "Subscribers fetched successfully",
    ))
}

pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(subscribed_channels))
        .route("/c/{channel_id}", get(channel_subscribers))
        .route("/{channel_id}/subscribe", post(subscribe))
        .route("/{channel_id}/unsubscribe", post(unsubscribe))
}
