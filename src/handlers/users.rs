//! Account and channel endpoints.
//!
//! - `POST /api/v1/users/register` - multipart sign-up with avatar
//! - `POST /api/v1/users/login` - sets `accessToken` / `refreshToken` cookies
//! - `POST /api/v1/users/logout`
//! - `POST /api/v1/users/refresh-token` - rotates the token pair
//! - `POST /api/v1/users/change-password`
//! - `GET /api/v1/users/current-user`
//! - `PATCH /api/v1/users/update-account`
//! - `PATCH /api/v1/users/change-avatar` / `change-cover`
//! - `GET /api/v1/users/channelProfile/{username}`
//! - `GET /api/v1/users/watchHistory`
//! - `DELETE /api/v1/users/delete-account`
//!
//! # Example
//!
//! ```bash
//! curl -X POST http://localhost:8000/api/v1/users/register \
//!   -F username=jane -F email=jane@example.com -F fullname="Jane Doe" \
//!   -F password=secret -F "avatar=@avatar.png"
//! ```

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse},
    routing::{delete, get, patch, post},
    Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, FormData};
use super::videos::release_video_assets;
use crate::error::{AppError, Result};
use crate::middleware::auth::cookie_value;
use crate::middleware::AuthUser;
use crate::models::{
    normalize_email, normalize_username, ApiResponse, ChangePasswordRequest, ChannelProfile,
    DeleteAccountRequest, Empty, LoginRequest, LoginResponse, PublicUser, RefreshTokenRequest,
    RegisterInput, UpdateAccountRequest, User, UserSummary, VideoView,
};
use crate::services::auth::{
    hash_password_blocking, hash_token, verify_password_blocking, TokenPair, REFRESH_COOKIE,
};
use crate::services::media::{MediaFolder, MediaKind};
use crate::state::AppState;

/// Issue a token pair and remember the refresh token's hash on the user.
///
/// With `presented`, the pair is only issued if that token's hash is still
/// the stored one, so each refresh token rotates exactly once.
fn start_session(
    state: &AppState,
    user_id: Uuid,
    presented: Option<&str>,
) -> Result<(User, TokenPair)> {
    state.db.modify_user(user_id, |user| {
        if let Some(token) = presented {
            if user.refresh_token_hash.as_deref() != Some(hash_token(token).as_str()) {
                warn!(user_id = %user.id, "Stale refresh token presented");
                return Err(AppError::unauthorized("Refresh token is expired or used"));
            }
        }

        let pair = state.auth.issue_pair(user)?;
        user.refresh_token_hash = Some(hash_token(&pair.refresh_token));
        Ok((user.clone(), pair))
    })
}

/// Register a new user
///
/// POST /api/v1/users/register
async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>> {
    let mut form = FormData::read(multipart).await?;

    let input = RegisterInput {
        username: form.text("username").unwrap_or_default(),
        email: form.text("email").unwrap_or_default(),
        password: form.raw("password").unwrap_or_default().to_string(),
        fullname: form.text("fullname").unwrap_or_default(),
    };
    if !input.is_complete() {
        return Err(AppError::validation("All fields are required!"));
    }
    if !input.email.contains('@') {
        return Err(AppError::validation("Invalid email address"));
    }

    if state.db.find_user_by_username(&input.username)?.is_some()
        || state.db.find_user_by_email(&input.email)?.is_some()
    {
        return Err(AppError::conflict("User with email or username already exists"));
    }

    let avatar = form
        .take_file("avatar")
        .ok_or_else(|| AppError::validation("Avatar file is required"))?;
    let cover = form.take_file("coverImage");

    // Reject bad files before anything is uploaded
    state.media.validate(&avatar, MediaFolder::Avatars)?;
    if let Some(cover) = &cover {
        state.media.validate(cover, MediaFolder::CoverImages)?;
    }

    let password_hash = hash_password_blocking(input.password.clone()).await?;

    let avatar = state.media.upload(&avatar, MediaFolder::Avatars).await?;
    let cover = match &cover {
        Some(file) => match state.media.upload(file, MediaFolder::CoverImages).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                state
                    .media
                    .discard(Some(&avatar.public_id), &avatar.url, MediaKind::Image)
                    .await;
                return Err(e);
            }
        },
        None => None,
    };

    let mut user = User::new(
        &input.username,
        &input.email,
        &input.fullname,
        password_hash,
        avatar.url.clone(),
        Some(avatar.public_id.clone()),
    );
    if let Some(cover) = &cover {
        user.cover_image = cover.url.clone();
        user.cover_image_public_id = Some(cover.public_id.clone());
    }

    if let Err(e) = state.db.insert_user(&user) {
        state
            .media
            .discard(Some(&avatar.public_id), &avatar.url, MediaKind::Image)
            .await;
        if let Some(cover) = &cover {
            state
                .media
                .discard(Some(&cover.public_id), &cover.url, MediaKind::Image)
                .await;
        }
        return Err(e);
    }

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(ApiResponse::created(
        user.to_public(),
        "User registered successfully",
    ))
}

/// Log in with username or email
///
/// POST /api/v1/users/login
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let username = request
        .username
        .as_deref()
        .map(normalize_username)
        .filter(|u| !u.is_empty());
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty());

    let user = match (username, email) {
        (Some(username), _) => state.db.find_user_by_username(&username)?,
        (None, Some(email)) => state.db.find_user_by_email(&email)?,
        (None, None) => return Err(AppError::validation("Username or email is required")),
    };
    let user = user.ok_or_else(|| AppError::not_found("User not found"))?;

    if !verify_password_blocking(request.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::validation("Invalid user credentials"));
    }

    let (user, pair) = start_session(&state, user.id, None)?;

    info!(user_id = %user.id, "User logged in");

    Ok((
        AppendHeaders(state.auth.session_cookies(&pair)),
        ApiResponse::ok(
            LoginResponse {
                user: user.to_public(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Forget the refresh token and clear cookies
///
/// POST /api/v1/users/logout
async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<impl IntoResponse> {
    state.db.modify_user(auth.id(), |user| {
        user.refresh_token_hash = None;
        Ok(())
    })?;

    Ok((
        AppendHeaders(state.auth.cleared_cookies()),
        ApiResponse::ok(Empty::default(), "User logged out"),
    ))
}

/// Exchange a refresh token for a new pair
///
/// POST /api/v1/users/refresh-token
///
/// The token comes from the `refreshToken` cookie, or from a JSON body
/// `{ "refreshToken": "..." }`.
async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let from_body = || {
        serde_json::from_slice::<RefreshTokenRequest>(&body)
            .ok()
            .and_then(|request| request.refresh_token)
            .filter(|token| !token.is_empty())
    };
    let token = cookie_value(&headers, REFRESH_COOKIE)
        .or_else(from_body)
        .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

    let claims = state.auth.verify_refresh(&token)?;

    let (_, pair) = start_session(&state, claims.sub, Some(&token)).map_err(|e| match e {
        AppError::NotFound(_) => AppError::unauthorized("Invalid refresh token"),
        e => e,
    })?;

    Ok((
        AppendHeaders(state.auth.session_cookies(&pair)),
        ApiResponse::ok(pair, "Access token refreshed"),
    ))
}

/// POST /api/v1/users/change-password
async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<Empty>> {
    if request.new_password.trim().is_empty() {
        return Err(AppError::validation("New password is required"));
    }
    if let Some(confirm) = request.confirm_password.as_deref() {
        if !confirm.is_empty() && confirm != request.new_password {
            return Err(AppError::validation("Passwords do not match"));
        }
    }

    let verified_hash = auth.user.password_hash;
    if !verify_password_blocking(request.old_password, verified_hash.clone()).await? {
        return Err(AppError::validation("Invalid old password"));
    }
    let new_hash = hash_password_blocking(request.new_password).await?;

    state.db.modify_user(auth.user.id, |user| {
        // The old password must still be current
        if user.password_hash != verified_hash {
            return Err(AppError::validation("Invalid old password"));
        }
        user.password_hash = new_hash;
        // Sessions started with the old password cannot be refreshed
        user.refresh_token_hash = None;
        user.touch();
        Ok(())
    })?;

    info!(user_id = %auth.user.id, "Password changed");

    Ok(ApiResponse::ok(Empty::default(), "Password changed successfully"))
}

/// GET /api/v1/users/current-user
async fn current_user(auth: AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(auth.user.to_public(), "User fetched successfully")
}

/// PATCH /api/v1/users/update-account
async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> Result<ApiResponse<PublicUser>> {
    let fullname = request
        .fullname
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty());

    if fullname.is_none() && email.is_none() {
        return Err(AppError::validation("At least one field is required"));
    }

    if email.as_deref().is_some_and(|email| !email.contains('@')) {
        return Err(AppError::validation("Invalid email address"));
    }

    let user = state.db.modify_user(auth.id(), |user| {
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(fullname) = fullname {
            user.fullname = fullname.to_string();
        }
        user.touch();
        Ok(user.clone())
    })?;

    Ok(ApiResponse::ok(
        user.to_public(),
        "Account details updated successfully",
    ))
}

/// Replace the avatar or cover image from multipart field `field`
async fn replace_image(
    state: &AppState,
    user_id: Uuid,
    multipart: Multipart,
    folder: MediaFolder,
) -> Result<User> {
    let field = match folder {
        MediaFolder::CoverImages => "coverImage",
        _ => "avatar",
    };

    let mut form = FormData::read(multipart).await?;
    let file = form
        .take_file(field)
        .ok_or_else(|| AppError::validation(format!("{} file is missing", field)))?;

    let asset = state.media.upload(&file, folder).await?;

    let updated = state.db.modify_user(user_id, |user| {
        let (old_url, old_id) = match folder {
            MediaFolder::CoverImages => (
                std::mem::replace(&mut user.cover_image, asset.url.clone()),
                user.cover_image_public_id.replace(asset.public_id.clone()),
            ),
            _ => (
                std::mem::replace(&mut user.avatar, asset.url.clone()),
                user.avatar_public_id.replace(asset.public_id.clone()),
            ),
        };
        user.touch();
        Ok((user.clone(), old_url, old_id))
    });

    let (user, old_url, old_id) = match updated {
        Ok(updated) => updated,
        Err(e) => {
            state
                .media
                .discard(Some(&asset.public_id), &asset.url, MediaKind::Image)
                .await;
            return Err(e);
        }
    };

    if !old_url.is_empty() {
        state
            .media
            .discard(old_id.as_deref(), &old_url, MediaKind::Image)
            .await;
    }

    Ok(user)
}

/// PATCH /api/v1/users/change-avatar
async fn change_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>> {
    let user = replace_image(&state, auth.id(), multipart, MediaFolder::Avatars).await?;
    Ok(ApiResponse::ok(user.to_public(), "Avatar updated successfully"))
}

/// PATCH /api/v1/users/change-cover
async fn change_cover(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>> {
    let user = replace_image(&state, auth.id(), multipart, MediaFolder::CoverImages).await?;
    Ok(ApiResponse::ok(
        user.to_public(),
        "Cover image updated successfully",
    ))
}

/// GET /api/v1/users/channelProfile/{username}
async fn channel_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(username): ApiPath<String>,
) -> Result<ApiResponse<ChannelProfile>> {
    let profile = state
        .db
        .channel_profile(&username, auth.id())?
        .ok_or_else(|| AppError::not_found("Channel not found"))?;

    Ok(ApiResponse::ok(profile, "Channel profile fetched successfully"))
}

/// GET /api/v1/users/watchHistory
async fn watch_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<Vec<VideoView<UserSummary>>>> {
    let history = state.db.watch_history(auth.id())?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}

/// Delete the account and everything it owns
///
/// DELETE /api/v1/users/delete-account
async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<DeleteAccountRequest>,
) -> Result<impl IntoResponse> {
    if !verify_password_blocking(request.password, auth.user.password_hash.clone()).await? {
        return Err(AppError::validation("Invalid password"));
    }

    let (user, videos) = state.db.delete_user_cascade(auth.id())?;

    for video in &videos {
        release_video_assets(&state, video).await;
    }
    state
        .media
        .discard(user.avatar_public_id.as_deref(), &user.avatar, MediaKind::Image)
        .await;
    if !user.cover_image.is_empty() {
        state
            .media
            .discard(
                user.cover_image_public_id.as_deref(),
                &user.cover_image,
                MediaKind::Image,
            )
            .await;
    }

    info!(user_id = %user.id, "Account deleted");

    Ok((
        AppendHeaders(state.auth.cleared_cookies()),
        ApiResponse::ok(Empty::default(), "Account deleted successfully"),
    ))
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/change-avatar", patch(change_avatar))
        .route("/change-cover", patch(change_cover))
        .route("/channelProfile/{username}", get(channel_profile))
        .route("/watchHistory", get(watch_history))
        .route("/delete-account", delete(delete_account))
}
