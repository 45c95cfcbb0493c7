//! Playlist entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered, duplicate-free list of videos owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub videos: Vec<Uuid>,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    pub fn new(name: String, description: String, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            videos: Vec::new(),
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Append a video; false if it was already present
    pub fn add_video(&mut self, video: Uuid) -> bool {
        if self.videos.contains(&video) {
            return false;
        }
        self.videos.push(video);
        self.updated_at = Utc::now();
        true
    }

    /// Remove a video; false if it was not present
    pub fn remove_video(&mut self, video: Uuid) -> bool {
        let before = self.videos.len();
        self.videos.retain(|id| *id != video);
        let removed = self.videos.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn view<V: Serialize>(&self, videos: V) -> PlaylistView<V> {
        PlaylistView {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            total_videos: self.videos.len(),
            videos,
            owner: self.owner,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Playlist as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView<V> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub total_videos: usize,
    pub videos: V,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /playlist` and `PATCH /playlist/{id}`
#[derive(Debug, Deserialize)]
pub struct PlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
