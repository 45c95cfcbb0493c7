//! Like documents.
//!
//! `likes_by_target` keys are `<kind>:<target>:<user>` so the pair
//! (target, user) is unique and counting likes is a prefix scan.

use rocksdb::WriteBatch;
use tracing::debug;
use uuid::Uuid;

use super::{pair_key, DatabaseService, CF_LIKES, CF_LIKES_BY_TARGET, CF_LIKES_BY_USER};
use crate::error::Result;
use crate::models::{Like, LikeTarget};

fn target_key(target: LikeTarget, user: Uuid) -> String {
    format!("{}:{}", target.key(), user)
}

fn target_prefix(target: LikeTarget) -> String {
    format!("{}:", target.key())
}

impl DatabaseService {
    /// The like `user` left on `target`, if any
    pub fn find_like(&self, target: LikeTarget, user: Uuid) -> Result<Option<Like>> {
        match self.get_id(CF_LIKES_BY_TARGET, &target_key(target, user))? {
            Some(id) => self.get_doc(CF_LIKES, id),
            None => Ok(None),
        }
    }

    /// Like or unlike; returns whether `target` is liked afterwards
    pub fn toggle_like(&self, target: LikeTarget, user: Uuid) -> Result<bool> {
        let _guard = self.lock_writes();

        let mut batch = WriteBatch::default();
        let liked = match self.find_like(target, user)? {
            Some(existing) => {
                self.stage_delete_like(&mut batch, &existing)?;
                false
            }
            None => {
                let like = Like::new(target, user);
                self.stage_doc(&mut batch, CF_LIKES, like.id, &like)?;
                self.stage_put(
                    &mut batch,
                    CF_LIKES_BY_TARGET,
                    &target_key(target, user),
                    like.id.to_string().as_bytes(),
                )?;
                self.stage_put(&mut batch, CF_LIKES_BY_USER, &pair_key(user, like.id), &[])?;
                true
            }
        };
        self.write(batch)?;

        debug!(target = %target.key(), user = %user, liked, "Toggled like");
        Ok(liked)
    }

    pub fn count_likes(&self, target: LikeTarget) -> Result<u64> {
        self.count_prefix(CF_LIKES_BY_TARGET, &target_prefix(target))
    }

    pub fn is_liked_by(&self, target: LikeTarget, user: Uuid) -> Result<bool> {
        Ok(self
            .get_id(CF_LIKES_BY_TARGET, &target_key(target, user))?
            .is_some())
    }

    /// Everything `user` liked, newest first
    pub fn liked_by_user(&self, user: Uuid) -> Result<Vec<Like>> {
        let ids = self.index_ids(CF_LIKES_BY_USER, user)?;
        let mut likes: Vec<Like> = self.get_docs(CF_LIKES, &ids)?;
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    fn stage_delete_like(&self, batch: &mut WriteBatch, like: &Like) -> Result<()> {
        self.stage_delete(batch, CF_LIKES, &like.id.to_string())?;
        self.stage_delete(batch, CF_LIKES_BY_TARGET, &target_key(like.target, like.liked_by))?;
        self.stage_delete(batch, CF_LIKES_BY_USER, &pair_key(like.liked_by, like.id))
    }

    pub(super) fn stage_delete_likes_for(&self, batch: &mut WriteBatch, target: LikeTarget) -> Result<()> {
        for (_, value) in self.scan_prefix(CF_LIKES_BY_TARGET, &target_prefix(target))? {
            let id = Uuid::parse_str(&String::from_utf8_lossy(&value))?;
            if let Some(like) = self.get_doc::<Like>(CF_LIKES, id)? {
                self.stage_delete_like(batch, &like)?;
            }
        }
        Ok(())
    }

    pub(super) fn stage_delete_likes_by(&self, batch: &mut WriteBatch, user: Uuid) -> Result<()> {
        for like in self.liked_by_user(user)? {
            self.stage_delete_like(batch, &like)?;
        }
        Ok(())
    }
}
