//! Video comment entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;

/// Comment left on a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub video: Uuid,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(content: String, video: Uuid, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content,
            video,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn view(&self, owner: UserSummary, likes_count: u64, is_liked: bool) -> CommentView {
        CommentView {
            id: self.id,
            content: self.content.clone(),
            video: self.video,
            owner,
            likes_count,
            is_liked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Comment as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub video: Uuid,
    pub owner: UserSummary,
    pub likes_count: u64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of comment and tweet create / update requests
#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: String,
}

impl ContentRequest {
    /// Trimmed content, `None` when blank
    pub fn content(&self) -> Option<String> {
        let content = self.content.trim();
        (!content.is_empty()).then(|| content.to_string())
    }
}
