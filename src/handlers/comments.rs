//! Comments on videos.
//!
//! - `GET /api/v1/comments/{videoId}?page=&limit=`
//! - `POST /api/v1/comments/{videoId}` `{ content }`
//! - `PATCH /api/v1/comments/c/{commentId}` `{ content }`
//! - `DELETE /api/v1/comments/c/{commentId}`

use axum::{
    extract::State,
    routing::{get, patch},
    Router,
};
use uuid::Uuid;

use super::ensure_owner;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::videos::visible_video;
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{
    ApiResponse, Comment, CommentView, ContentRequest, Empty, LikeTarget, Page, PageQuery,
};
use crate::state::AppState;

fn owned_comment(state: &AppState, id: Uuid, user: Uuid) -> Result<Comment> {
    let comment = state
        .db
        .get_comment(id)?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    ensure_owner(comment.owner, user, "comment")?;
    Ok(comment)
}

/// GET /api/v1/comments/{videoId}
async fn video_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<ApiResponse<Page<CommentView>>> {
    visible_video(&state, video_id, auth.id())?;

    let (page, limit) = query.normalize(state.max_page_size());
    let comments = state.db.comment_views(video_id, auth.id())?;

    Ok(ApiResponse::ok(
        Page::paginate(comments, page, limit),
        "Comments fetched successfully",
    ))
}

/// POST /api/v1/comments/{videoId}
async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(video_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ContentRequest>,
) -> Result<ApiResponse<CommentView>> {
    let content = body
        .content()
        .ok_or_else(|| AppError::validation("Comment content is required"))?;
    visible_video(&state, video_id, auth.id())?;

    let comment = Comment::new(content, video_id, auth.id());
    state.db.insert_comment(&comment)?;

    Ok(ApiResponse::created(
        comment.view(auth.user.summary(), 0, false),
        "Comment added successfully",
    ))
}

/// PATCH /api/v1/comments/c/{commentId}
async fn update_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(comment_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ContentRequest>,
) -> Result<ApiResponse<CommentView>> {
    let content = body
        .content()
        .ok_or_else(|| AppError::validation("Comment content is required"))?;

    owned_comment(&state, comment_id, auth.id())?;
    let comment = state.db.modify_comment(comment_id, |comment| {
        comment.content = content;
        comment.touch();
        Ok(comment.clone())
    })?;

    let target = LikeTarget::Comment(comment.id);
    let view = comment.view(
        auth.user.summary(),
        state.db.count_likes(target)?,
        state.db.is_liked_by(target, auth.id())?,
    );
    Ok(ApiResponse::ok(view, "Comment updated successfully"))
}

/// DELETE /api/v1/comments/c/{commentId}
async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(comment_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Empty>> {
    owned_comment(&state, comment_id, auth.id())?;
    state.db.delete_comment(comment_id)?;

    Ok(ApiResponse::ok(Empty::default(), "Comment deleted successfully"))
}

pub fn comment_routes() -> Router<AppState> {
    Router::new()
        .route("/{video_id}", get(video_comments).post(add_comment))
        .route(
            "/c/{comment_id}",
            patch(update_comment).delete(delete_comment),
        )
}
