//! Account removal across every collection.

use rocksdb::WriteBatch;
use tracing::info;
use uuid::Uuid;

use super::DatabaseService;
use crate::error::{AppError, Result};
use crate::models::{User, Video};

impl DatabaseService {
    /// Delete user `id` and everything they own or took part in, in one batch.
    ///
    /// Returns the removed user and videos so their media can be released.
    pub fn delete_user_cascade(&self, id: Uuid) -> Result<(User, Vec<Video>)> {
        let _guard = self.lock_writes();

        let user = self
            .get_user(id)?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let mut batch = WriteBatch::default();

        let videos = self.videos_by_owner(user.id)?;
        self.stage_delete_videos(&mut batch, &videos)?;
        for comment in self.comments_by_owner(user.id)? {
            self.stage_delete_comment(&mut batch, &comment)?;
        }
        for tweet in self.tweets_by_owner(user.id)? {
            self.stage_delete_tweet(&mut batch, &tweet)?;
        }
        for playlist in self.playlists_by_owner(user.id)? {
            self.stage_delete_playlist(&mut batch, &playlist)?;
        }
        self.stage_delete_likes_by(&mut batch, user.id)?;
        self.stage_delete_subscriptions_of(&mut batch, user.id)?;
        self.stage_delete_user(&mut batch, &user)?;

        self.write(batch)?;

        info!(id = %user.id, videos = videos.len(), "Deleted user account");
        Ok((user, videos))
    }
}
