//! Video entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uploaded video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Unique identifier (UUID v4)
    pub id: Uuid,

    /// Playback URL on the media host
    pub video_file: String,

    /// Media host id of the video file
    pub video_public_id: String,

    /// Thumbnail URL (uploaded or derived by the host), may be empty
    pub thumbnail: String,

    /// Media host id of an uploaded thumbnail; `None` for derived ones
    pub thumbnail_public_id: Option<String>,

    pub title: String,
    pub description: String,

    /// Length in seconds as reported by the media host
    pub duration: f64,

    pub views: u64,
    pub is_published: bool,

    /// Uploading user
    pub owner: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// New published video with no thumbnail yet
    pub fn new(
        owner: Uuid,
        title: String,
        description: String,
        video_file: String,
        video_public_id: String,
        duration: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            video_file,
            video_public_id,
            thumbnail: String::new(),
            thumbnail_public_id: None,
            title,
            description,
            duration,
            views: 0,
            is_published: true,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Is the video visible to `viewer`
    pub fn is_visible_to(&self, viewer: Uuid) -> bool {
        self.is_published || self.owner == viewer
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Client view with the owner rendered as `O`
    pub fn view<O: Serialize>(&self, owner: O) -> VideoView<O> {
        VideoView {
            id: self.id,
            video_file: self.video_file.clone(),
            thumbnail: self.thumbnail.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            duration: self.duration,
            views: self.views,
            is_published: self.is_published,
            owner,
            likes_count: None,
            is_liked: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Video as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView<O> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: u64,
    pub is_published: bool,
    pub owner: O,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<O> VideoView<O> {
    pub fn with_likes(mut self, likes_count: u64, is_liked: Option<bool>) -> Self {
        self.likes_count = Some(likes_count);
        self.is_liked = is_liked;
        self
    }
}

/// Sort key for `GET /videos`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum VideoSortBy {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "views")]
    Views,
    #[serde(rename = "duration")]
    Duration,
    #[serde(rename = "title")]
    Title,
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Asc,
    #[default]
    Desc,
}

/// Query string of `GET /videos`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    #[serde(default)]
    pub sort_by: VideoSortBy,
    #[serde(default)]
    pub sort_type: SortType,
    pub user_id: Option<Uuid>,
}

impl VideoListQuery {
    /// Does `video` match the free text filter
    pub fn matches(&self, video: &Video) -> bool {
        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                video.title.to_lowercase().contains(&needle)
                    || video.description.to_lowercase().contains(&needle)
            }
        }
    }

    /// Sort in place according to `sort_by` / `sort_type`
    pub fn sort(&self, videos: &mut [Video]) {
        videos.sort_by(|a, b| {
            let ordering = match self.sort_by {
                VideoSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                VideoSortBy::Views => a.views.cmp(&b.views),
                VideoSortBy::Duration => a.duration.total_cmp(&b.duration),
                VideoSortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            };
            match self.sort_type {
                SortType::Asc => ordering,
                SortType::Desc => ordering.reverse(),
            }
        });
    }
}
