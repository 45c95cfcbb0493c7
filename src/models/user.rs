//! User entity and its client-facing views.
//!
//! A `User` is stored with its password hash and the hash of its current
//! refresh token. Neither ever leaves the server: handlers always respond
//! with [`PublicUser`] or one of the summary types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered user (also a channel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: Uuid,

    /// Unique, lowercase handle
    pub username: String,

    /// Unique, lowercase email address
    pub email: String,

    /// Display name
    pub fullname: String,

    /// Avatar URL on the media host
    pub avatar: String,

    /// Media host id of the avatar
    pub avatar_public_id: Option<String>,

    /// Cover image URL, empty when none was uploaded
    pub cover_image: String,

    /// Media host id of the cover image
    pub cover_image_public_id: Option<String>,

    /// Watched videos, most recent first
    pub watch_history: Vec<Uuid>,

    /// Argon2 PHC string
    pub password_hash: String,

    /// SHA-256 hex of the refresh token currently allowed to rotate
    pub refresh_token_hash: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Maximum watch history entries kept per user
pub const WATCH_HISTORY_LIMIT: usize = 200;

impl User {
    /// Create a new user; `username` and `email` are normalized
    pub fn new(
        username: &str,
        email: &str,
        fullname: &str,
        password_hash: String,
        avatar: String,
        avatar_public_id: Option<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            username: normalize_username(username),
            email: normalize_email(email),
            fullname: fullname.trim().to_string(),
            avatar,
            avatar_public_id,
            cover_image: String::new(),
            cover_image_public_id: None,
            watch_history: Vec::new(),
            password_hash,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move a video to the front of the watch history
    pub fn record_watch(&mut self, video_id: Uuid) {
        self.watch_history.retain(|id| *id != video_id);
        self.watch_history.insert(0, video_id);
        self.watch_history.truncate(WATCH_HISTORY_LIMIT);
    }

    /// Client-facing view without credentials
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            watch_history: self.watch_history.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Short owner view embedded in videos, comments and tweets
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            fullname: self.fullname.clone(),
            avatar: self.avatar.clone(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Lowercase, trimmed username
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Lowercase, trimmed email
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner block embedded in other records
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
}

/// Channel page for `GET /users/channelProfile/{username}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    pub subscriber_count: u64,
    pub subscribed_to_channel_count: u64,
    pub is_subscribed: bool,
}

/// Owner block on the video details page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOwner {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
    pub subscribers: u64,
    pub is_subscribed: bool,
}

/// A channel in a subscription list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
    pub subscriber_count: u64,
}

/// Data of a successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Registration form fields
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub fullname: String,
}

impl RegisterInput {
    /// All four fields must be non-blank
    pub fn is_complete(&self) -> bool {
        [&self.username, &self.email, &self.password, &self.fullname]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// `POST /users/login`
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// `POST /users/change-password`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    pub confirm_password: Option<String>,
}

/// `PATCH /users/update-account`
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

/// `POST /users/refresh-token` body (cookie takes precedence)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

/// `DELETE /users/delete-account`
#[derive(Debug, Default, Deserialize)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub password: String,
}
