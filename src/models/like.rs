//! Like entity.
//!
//! A like points at exactly one video, comment or tweet. The target is an
//! enum so the "exactly one" rule holds by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a like points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LikeTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    /// Index key prefix, e.g. `v:<uuid>`
    pub fn key(&self) -> String {
        match self {
            Self::Video(id) => format!("v:{}", id),
            Self::Comment(id) => format!("c:{}", id),
            Self::Tweet(id) => format!("t:{}", id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Video(id) | Self::Comment(id) | Self::Tweet(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub target: LikeTarget,
    pub liked_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn new(target: LikeTarget, liked_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            liked_by,
            created_at: Utc::now(),
        }
    }
}

/// Data of toggle responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub is_liked: bool,
}
