//! Comment documents, indexed by video and by owner.

use rocksdb::WriteBatch;
use tracing::debug;
use uuid::Uuid;

use super::{pair_key, DatabaseService, CF_COMMENTS, CF_COMMENTS_BY_OWNER, CF_COMMENTS_BY_VIDEO};
use crate::error::{AppError, Result};
use crate::models::{Comment, LikeTarget};

impl DatabaseService {
    /// Insert a comment; 404 if its video no longer exists
    pub fn insert_comment(&self, comment: &Comment) -> Result<()> {
        let _guard = self.lock_writes();

        if self.get_video(comment.video)?.is_none() {
            return Err(AppError::not_found("Video not found"));
        }

        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, CF_COMMENTS, comment.id, comment)?;
        self.stage_put(
            &mut batch,
            CF_COMMENTS_BY_VIDEO,
            &pair_key(comment.video, comment.id),
            &[],
        )?;
        self.stage_put(
            &mut batch,
            CF_COMMENTS_BY_OWNER,
            &pair_key(comment.owner, comment.id),
            &[],
        )?;
        self.write(batch)?;

        debug!(id = %comment.id, video = %comment.video, "Inserted comment");
        Ok(())
    }

    pub fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.get_doc(CF_COMMENTS, id)
    }

    /// Apply `change` to the stored comment under the write lock
    pub fn modify_comment<R, F>(&self, id: Uuid, change: F) -> Result<R>
    where
        F: FnOnce(&mut Comment) -> Result<R>,
    {
        self.modify_doc(CF_COMMENTS, id, "Comment not found", change)
    }

    /// Comments on a video, newest first
    pub fn comments_for_video(&self, video: Uuid) -> Result<Vec<Comment>> {
        let ids = self.index_ids(CF_COMMENTS_BY_VIDEO, video)?;
        let mut comments: Vec<Comment> = self.get_docs(CF_COMMENTS, &ids)?;
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    pub(super) fn comments_by_owner(&self, owner: Uuid) -> Result<Vec<Comment>> {
        let ids = self.index_ids(CF_COMMENTS_BY_OWNER, owner)?;
        self.get_docs(CF_COMMENTS, &ids)
    }

    /// Remove a comment and the likes on it
    pub fn delete_comment(&self, id: Uuid) -> Result<()> {
        let _guard = self.lock_writes();

        let comment = self
            .get_comment(id)?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;

        let mut batch = WriteBatch::default();
        self.stage_delete_comment(&mut batch, &comment)?;
        self.write(batch)?;

        debug!(id = %comment.id, "Deleted comment");
        Ok(())
    }

    pub(super) fn stage_delete_comment(&self, batch: &mut WriteBatch, comment: &Comment) -> Result<()> {
        self.stage_delete(batch, CF_COMMENTS, &comment.id.to_string())?;
        self.stage_delete(batch, CF_COMMENTS_BY_VIDEO, &pair_key(comment.video, comment.id))?;
        self.stage_delete(batch, CF_COMMENTS_BY_OWNER, &pair_key(comment.owner, comment.id))?;
        self.stage_delete_likes_for(batch, LikeTarget::Comment(comment.id))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::AppError;
    use crate::models::{Comment, LikeTarget};
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn test_comments_newest_first() {
        let (db, _temp) = create_test_db();
        let author = Uuid::new_v4();
        let clip = video(Uuid::new_v4(), "clip");
        let other = video(Uuid::new_v4(), "other");
        db.insert_video(&clip).unwrap();
        db.insert_video(&other).unwrap();

        let mut older = Comment::new("first".into(), clip.id, author);
        older.created_at = older.created_at - Duration::minutes(5);
        let newer = Comment::new("second".into(), clip.id, author);
        db.insert_comment(&older).unwrap();
        db.insert_comment(&newer).unwrap();
        db.insert_comment(&Comment::new("elsewhere".into(), other.id, author))
            .unwrap();

        let comments = db.comments_for_video(clip.id).unwrap();
        let contents: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["second", "first"]);
    }

    #[test]
    fn test_comment_on_missing_video_is_rejected() {
        let (db, _temp) = create_test_db();
        let comment = Comment::new("late".into(), Uuid::new_v4(), Uuid::new_v4());

        let err = db.insert_comment(&comment).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(db.get_comment(comment.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_comment_removes_likes() {
        let (db, _temp) = create_test_db();
        let clip = video(Uuid::new_v4(), "clip");
        db.insert_video(&clip).unwrap();
        let comment = Comment::new("hello".into(), clip.id, Uuid::new_v4());
        db.insert_comment(&comment).unwrap();
        let fan = Uuid::new_v4();
        assert!(db.toggle_like(LikeTarget::Comment(comment.id), fan).unwrap());

        db.modify_comment(comment.id, |c| {
            c.content = "edited".into();
            Ok(())
        })
        .unwrap();
        assert_eq!(db.get_comment(comment.id).unwrap().unwrap().content, "edited");

        db.delete_comment(comment.id).unwrap();

        assert!(db.get_comment(comment.id).unwrap().is_none());
        assert!(db.comments_for_video(clip.id).unwrap().is_empty());
        assert_eq!(db.count_likes(LikeTarget::Comment(comment.id)).unwrap(), 0);
        assert!(matches!(
            db.delete_comment(comment.id).unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
