//! Tweet documents, indexed by owner.

use rocksdb::WriteBatch;
use tracing::debug;
use uuid::Uuid;

use super::{pair_key, DatabaseService, CF_TWEETS, CF_TWEETS_BY_OWNER};
use crate::error::{AppError, Result};
use crate::models::{LikeTarget, Tweet};

impl DatabaseService {
    pub fn insert_tweet(&self, tweet: &Tweet) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, CF_TWEETS, tweet.id, tweet)?;
        self.stage_put(
            &mut batch,
            CF_TWEETS_BY_OWNER,
            &pair_key(tweet.owner, tweet.id),
            &[],
        )?;
        self.write(batch)?;

        debug!(id = %tweet.id, owner = %tweet.owner, "Inserted tweet");
        Ok(())
    }

    pub fn get_tweet(&self, id: Uuid) -> Result<Option<Tweet>> {
        self.get_doc(CF_TWEETS, id)
    }

    pub fn modify_tweet<R, F>(&self, id: Uuid, change: F) -> Result<R>
    where
        F: FnOnce(&mut Tweet) -> Result<R>,
    {
        self.modify_doc(CF_TWEETS, id, "Tweet not found", change)
    }

    /// Tweets by `owner`, newest first
    pub fn tweets_by_owner(&self, owner: Uuid) -> Result<Vec<Tweet>> {
        let ids = self.index_ids(CF_TWEETS_BY_OWNER, owner)?;
        let mut tweets: Vec<Tweet> = self.get_docs(CF_TWEETS, &ids)?;
        tweets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tweets)
    }

    /// Remove a tweet and the likes on it
    pub fn delete_tweet(&self, id: Uuid) -> Result<()> {
        let _guard = self.lock_writes();

        let tweet = self
            .get_tweet(id)?
            .ok_or_else(|| AppError::not_found("Tweet not found"))?;

        let mut batch = WriteBatch::default();
        self.stage_delete_tweet(&mut batch, &tweet)?;
        self.write(batch)
    }

    pub(super) fn stage_delete_tweet(&self, batch: &mut WriteBatch, tweet: &Tweet) -> Result<()> {
        self.stage_delete(batch, CF_TWEETS, &tweet.id.to_string())?;
        self.stage_delete(batch, CF_TWEETS_BY_OWNER, &pair_key(tweet.owner, tweet.id))?;
        self.stage_delete_likes_for(batch, LikeTarget::Tweet(tweet.id))
    }
}
