//! Playlists.
//!
//! - `POST /api/v1/playlist` `{ name, description? }`
//! - `GET /api/v1/playlist/user/{userId}`
//! - `GET|PATCH|DELETE /api/v1/playlist/{playlistId}`
//! - `PATCH /api/v1/playlist/add/{videoId}/{playlistId}`
//! - `PATCH /api/v1/playlist/remove/{videoId}/{playlistId}`

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
use crate::models::{
    ApiResponse, Empty, Playlist, PlaylistRequest, PlaylistView, UserSummary, VideoView,
};
use crate::state::AppState;

type DetailedPlaylist = PlaylistView<Vec<VideoView<UserSummary>>>;

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn find_playlist(state: &AppState, id: Uuid) -> Result<Playlist> {
    state
        .db
        .get_playlist(id)?
        .ok_or_else(|| AppError::not_found("Playlist not found"))
}

fn owned_playlist(state: &AppState, id: Uuid, user: Uuid) -> Result<Playlist> {
    let playlist = find_playlist(state, id)?;
    ensure_owner(playlist.owner, user, "playlist")?;
    Ok(playlist)
}

/// Resolve the playlist's videos as seen by `viewer`
fn detailed(state: &AppState, playlist: &Playlist, viewer: Uuid) -> Result<DetailedPlaylist> {
    let videos = state
        .db
        .get_videos(&playlist.videos)?
        .into_iter()
        .filter(|video| video.is_visible_to(viewer))
        .collect();
    Ok(playlist.view(state.db.video_views(videos)?))
}

/// POST /api/v1/playlist
async fn create_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<PlaylistRequest>,
) -> Result<ApiResponse<PlaylistView<Vec<Uuid>>>> {
    let name = trimmed(body.name)
        .ok_or_else(|| AppError::validation("Playlist name is required"))?;
    let description = trimmed(body.description).unwrap_or_default();

    let playlist = Playlist::new(name, description, auth.id());
    state.db.insert_playlist(&playlist)?;

    Ok(ApiResponse::created(
        playlist.view(playlist.videos.clone()),
        "Playlist created successfully",
    ))
}

/// GET /api/v1/playlist/user/{userId}
async fn user_playlists(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<PlaylistView<Vec<Uuid>>>>> {
    state
        .db
        .get_user(user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let playlists = state
        .db
        .playlists_by_owner(user_id)?
        .iter()
        .map(|playlist| playlist.view(playlist.videos.clone()))
        .collect();

    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}

/// GET /api/v1/playlist/{playlistId}
async fn get_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(playlist_id): ApiPath<Uuid>,
) -> Result<ApiResponse<DetailedPlaylist>> {
    let playlist = find_playlist(&state, playlist_id)?;
    Ok(ApiResponse::ok(
        detailed(&state, &playlist, auth.id())?,
        "Playlist fetched successfully",
    ))
}

/// PATCH /api/v1/playlist/{playlistId}
async fn update_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(playlist_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<PlaylistRequest>,
) -> Result<ApiResponse<PlaylistView<Vec<Uuid>>>> {
    let name = trimmed(body.name);
    let description = body.description.map(|d| d.trim().to_string());
    if name.is_none() && description.is_none() {
        return Err(AppError::validation("Name or description is required"));
    }

    owned_playlist(&state, playlist_id, auth.id())?;
    let playlist = state.db.modify_playlist(playlist_id, |playlist| {
        if let Some(name) = name {
            playlist.name = name;
        }
        if let Some(description) = description {
            playlist.description = description;
        }
        playlist.touch();
        Ok(playlist.clone())
    })?;

    Ok(ApiResponse::ok(
        playlist.view(playlist.videos.clone()),
        "Playlist updated successfully",
    ))
}

/// DELETE /api/v1/playlist/{playlistId}
async fn delete_playlist(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(playlist_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Empty>> {
    owned_playlist(&state, playlist_id, auth.id())?;
    state.db.delete_playlist(playlist_id)?;
    Ok(ApiResponse::ok(Empty::default(), "Playlist deleted successfully"))
}

/// PATCH /api/v1/playlist/add/{videoId}/{playlistId}
async fn add_video(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((video_id, playlist_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ApiResponse<DetailedPlaylist>> {
    owned_playlist(&state, playlist_id, auth.id())?;

    let playlist = state.db.modify_playlist(playlist_id, |playlist| {
        if state.db.get_video(video_id)?.is_none() {
            return Err(AppError::not_found("Video not found"));
        }
        if !playlist.add_video(video_id) {
            return Err(AppError::validation("Video already in playlist"));
        }
        Ok(playlist.clone())
    })?;

    Ok(ApiResponse::ok(
        detailed(&state, &playlist, auth.id())?,
        "Video added to playlist",
    ))
}

/// PATCH /api/v1/playlist/remove/{videoId}/{playlistId}
async fn remove_video(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((video_id, playlist_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ApiResponse<DetailedPlaylist>> {
    owned_playlist(&state, playlist_id, auth.id())?;

    let playlist = state.db.modify_playlist(playlist_id, |playlist| {
        if !playlist.remove_video(video_id) {
            return Err(AppError::validation("Video not in playlist"));
        }
        Ok(playlist.clone())
    })?;

    Ok(ApiResponse::ok(
        detailed(&state, &playlist, auth.id())?,
        "Video removed from playlist",
    ))
}

pub fn playlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_playlist))
        .route("/user/{user_id}", get(user_playlists))
        .route(
            "/{playlist_id}",
            get(get_playlist)
                .patch(update_playlist)
                .delete(delete_playlist),
        )
        .route("/add/{video_id}/{playlist_id}", patch(add_video))
        .route("/remove/{video_id}/{playlist_id}", patch(remove_video))
}
