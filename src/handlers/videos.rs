//! Video endpoints.
//!
//! - `GET /api/v1/videos` - search, sort and paginate visible videos
//! - `POST /api/v1/videos` - multipart upload (`videoFile`, optional `thumbnail`)
//! - `GET /api/v1/videos/{videoId}` - details; counts a view
//! - `PATCH /api/v1/videos/{videoId}` - title, description, thumbnail
//! - `DELETE /api/v1/videos/{videoId}`
//! - `PATCH /api/v1/videos/toggle/publish/{videoId}`
//!
//! # Example
//!
//! ```bash
//! curl -X POST http://localhost:8000/api/v1/videos \
//!   -b cookies.txt -F title="My trip" -F description="Day one" \
//!   -F "videoFile=@trip.mp4" -F "thumbnail=@trip.jpg"
//! ```

use axum::{
    extract::{Multipart, State},
    routing::{get, patch},
    Router,
};
use tracing::info;
use uuid::Uuid;

use super::ensure_owner;
use super::extract::{ApiPath, ApiQuery, FormData};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{
    ApiResponse, ChannelOwner, Empty, Page, PageQuery, UserSummary, Video, VideoListQuery,
    VideoView,
};
use crate::services::media::{MediaFolder, MediaKind};
use crate::state::AppState;

/// Load a video the caller is allowed to see
pub(crate) fn visible_video(state: &AppState, id: Uuid, viewer: Uuid) -> Result<Video> {
    state
        .db
        .get_video(id)?
        .filter(|video| video.is_visible_to(viewer))
        .ok_or_else(|| AppError::not_found("Video not found"))
}

/// Load a video the caller owns
fn owned_video(state: &AppState, id: Uuid, user: Uuid) -> Result<Video> {
    let video = state
        .db
        .get_video(id)?
        .ok_or_else(|| AppError::not_found("Video not found"))?;
    ensure_owner(video.owner, user, "video")?;
    Ok(video)
}

/// Delete the media behind a removed video. Derived thumbnails have no
/// asset of their own.
pub(crate) async fn release_video_assets(state: &AppState, video: &Video) {
    state
        .media
        .discard(Some(&video.video_public_id), &video.video_file, MediaKind::Video)
        .await;
    if let Some(public_id) = &video.thumbnail_public_id {
        state
            .media
            .discard(Some(public_id), &video.thumbnail, MediaKind::Image)
            .await;
    }
}

/// GET /api/v1/videos
async fn list_videos(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<VideoListQuery>,
) -> Result<ApiResponse<Page<VideoView<UserSummary>>>> {
    let viewer = auth.id();

    let candidates = match query.user_id {
        Some(owner) => state.db.videos_by_owner(owner)?,
        None => state.db.list_videos()?,
    };
    let mut videos: Vec<Video> = candidates
        .into_iter()
        .filter(|video| video.is_visible_to(viewer) && query.matches(video))
        .collect();
    query.sort(&mut videos);

    let (page, limit) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .normalize(state.max_page_size());

    let views = state.db.video_views(videos)?;
    Ok(ApiResponse::ok(
        Page::paginate(views, page, limit),
        "Videos fetched successfully",
    ))
}

/// Upload and publish a video
///
/// POST /api/v1/videos
async fn publish_video(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<VideoView<UserSummary>>> {
    let mut form = FormData::read(multipart).await?;

    let (Some(title), Some(description)) = (form.text("title"), form.text("description")) else {
        return Err(AppError::validation("Title and description are required"));
    };
    let is_published = form.flag("isPublished")?.unwrap_or(true);

    let video_file = form
        .take_file("videoFile")
        .ok_or_else(|| AppError::validation("Video file is required"))?;
    let thumbnail = form.take_file("thumbnail");

    state.media.validate(&video_file, MediaFolder::Videos)?;
    if let Some(thumbnail) = &thumbnail {
        state.media.validate(thumbnail, MediaFolder::Thumbnails)?;
    }

    let uploaded = state.media.upload(&video_file, MediaFolder::Videos).await?;

    let mut video = Video::new(
        auth.id(),
        title,
        description,
        uploaded.url.clone(),
        uploaded.public_id.clone(),
        uploaded.duration.unwrap_or(0.0),
    );
    video.is_published = is_published;

    match &thumbnail {
        Some(file) => match state.media.upload(file, MediaFolder::Thumbnails).await {
            Ok(asset) => {
                video.thumbnail = asset.url;
                video.thumbnail_public_id = Some(asset.public_id);
            }
            Err(e) => {
                release_video_assets(&state, &video).await;
                return Err(e);
            }
        },
        None => {
            video.thumbnail = state
                .media
                .video_thumbnail(&uploaded.public_id)
                .unwrap_or_default();
        }
    }

    if let Err(e) = state.db.insert_video(&video) {
        release_video_assets(&state, &video).await;
        return Err(e);
    }

    info!(video_id = %video.id, owner = %video.owner, "Video published");

    Ok(ApiResponse::created(
        video.view(auth.user.summary()),
        "Video published successfully",
    ))
}

/// Video details; counts a view and records watch history
///
/// GET /api/v1/videos/{videoId}
async fn get_video(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> Result<ApiResponse<VideoView<ChannelOwner>>> {
    let viewer = auth.id();
    visible_video(&state, video_id, viewer)?;

    let video = state
        .db
        .record_view(video_id, viewer)?
        .ok_or_else(|| AppError::not_found("Video not found"))?;

    let details = state
        .db
        .video_details(&video, viewer)?
        .ok_or_else(|| AppError::not_found("Video not found"))?;

    Ok(ApiResponse::ok(details, "Video fetched successfully"))
}

/// PATCH /api/v1/videos/{videoId}
async fn update_video(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
    multipart: Multipart,
) -> Result<ApiResponse<VideoView<UserSummary>>> {
    let mut form = FormData::read(multipart).await?;
    let title = form.text("title");
    let description = form.text("description");
    let thumbnail = form.take_file("thumbnail");

    if title.is_none() && description.is_none() && thumbnail.is_none() {
        return Err(AppError::unprocessable("At least one field must be provided"));
    }

    // Rejects strangers before anything is uploaded
    owned_video(&state, video_id, auth.id())?;

    let asset = match &thumbnail {
        Some(file) => Some(state.media.upload(file, MediaFolder::Thumbnails).await?),
        None => None,
    };

    let updated = state.db.modify_video(video_id, |video| {
        let mut replaced = None;
        if let Some(asset) = &asset {
            let old_url = std::mem::replace(&mut video.thumbnail, asset.url.clone());
            let old_id = video.thumbnail_public_id.replace(asset.public_id.clone());
            replaced = old_id.map(|id| (id, old_url));
        }
        if let Some(title) = title {
            video.title = title;
        }
        if let Some(description) = description {
            video.description = description;
        }
        video.touch();
        Ok((video.clone(), replaced))
    });

    let (video, replaced) = match updated {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(asset) = &asset {
                state
                    .media
                    .discard(Some(&asset.public_id), &asset.url, MediaKind::Image)
                    .await;
            }
            return Err(e);
        }
    };

    if let Some((public_id, url)) = replaced {
        state
            .media
            .discard(Some(&public_id), &url, MediaKind::Image)
            .await;
    }

    Ok(ApiResponse::ok(
        video.view(auth.user.summary()),
        "Video updated successfully",
    ))
}

/// DELETE /api/v1/videos/{videoId}
async fn delete_video(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Empty>> {
    owned_video(&state, video_id, auth.id())?;

    let video = state.db.delete_video(video_id)?;
    release_video_assets(&state, &video).await;

    info!(video_id = %video.id, "Video deleted");

    Ok(ApiResponse::ok(Empty::default(), "Video deleted successfully"))
}

/// PATCH /api/v1/videos/toggle/publish/{videoId}
async fn toggle_publish(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
) -> Result<ApiResponse<VideoView<UserSummary>>> {
    owned_video(&state, video_id, auth.id())?;

    let video = state.db.modify_video(video_id, |video| {
        video.is_published = !video.is_published;
        video.touch();
        Ok(video.clone())
    })?;

    let message = if video.is_published {
        "Video published"
    } else {
        "Video unpublished"
    };
    Ok(ApiResponse::ok(video.view(auth.user.summary()), message))
}

/// Create video routes
pub fn video_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_videos).post(publish_video))
        .route(
            "/{video_id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/toggle/publish/{video_id}", patch(toggle_publish))
}
