//! Channel statistics for the creator dashboard.

use serde::Serialize;

/// `GET /dashboard/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_videos: u64,
    pub total_views: u64,
    pub total_subscribers: u64,
    /// Likes received on the channel's videos
    pub total_likes: u64,
    pub total_tweets: u64,
}
