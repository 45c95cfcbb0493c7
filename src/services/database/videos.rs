//! Video documents, indexed by owner.

use rocksdb::WriteBatch;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::{pair_key, DatabaseService, CF_PLAYLISTS, CF_USERS, CF_VIDEOS, CF_VIDEOS_BY_OWNER};
use crate::error::{AppError, Result};
use crate::models::{LikeTarget, Playlist, Video};

impl DatabaseService {
    /// Insert a new video record
    pub fn insert_video(&self, video: &Video) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, CF_VIDEOS, video.id, video)?;
        self.stage_put(
            &mut batch,
            CF_VIDEOS_BY_OWNER,
            &pair_key(video.owner, video.id),
            &[],
        )?;
        self.write(batch)?;

        debug!(id = %video.id, owner = %video.owner, "Inserted video");
        Ok(())
    }

    /// Get a video by ID
    pub fn get_video(&self, id: Uuid) -> Result<Option<Video>> {
        self.get_doc(CF_VIDEOS, id)
    }

    /// Load several videos in the given order, skipping missing ones
    pub fn get_videos(&self, ids: &[Uuid]) -> Result<Vec<Video>> {
        self.get_docs(CF_VIDEOS, ids)
    }

    /// Apply `change` to the stored video under the write lock. The owner
    /// never changes. 404 if the video is gone.
    pub fn modify_video<R, F>(&self, id: Uuid, change: F) -> Result<R>
    where
        F: FnOnce(&mut Video) -> Result<R>,
    {
        self.modify_doc(CF_VIDEOS, id, "Video not found", change)
    }

    /// Count a view of `video` by `viewer` and put the video at the front of
    /// the viewer's watch history. Returns the updated video.
    pub fn record_view(&self, video: Uuid, viewer: Uuid) -> Result<Option<Video>> {
        let _guard = self.lock_writes();

        let Some(mut video) = self.get_video(video)? else {
            return Ok(None);
        };
        video.views += 1;

        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, CF_VIDEOS, video.id, &video)?;
        if let Some(mut user) = self.get_user(viewer)? {
            user.record_watch(video.id);
            self.stage_doc(&mut batch, CF_USERS, user.id, &user)?;
        }
        self.write(batch)?;

        Ok(Some(video))
    }

    /// Every video in the store
    pub fn list_videos(&self) -> Result<Vec<Video>> {
        self.scan_docs(CF_VIDEOS)
    }

    /// Videos uploaded by `owner`
    pub fn videos_by_owner(&self, owner: Uuid) -> Result<Vec<Video>> {
        let ids = self.index_ids(CF_VIDEOS_BY_OWNER, owner)?;
        self.get_videos(&ids)
    }

    /// Remove a video together with its comments, all likes on it and on
    /// its comments, and its playlist memberships. Returns the removed video.
    pub fn delete_video(&self, id: Uuid) -> Result<Video> {
        let _guard = self.lock_writes();

        let video = self
            .get_video(id)?
            .ok_or_else(|| AppError::not_found("Video not found"))?;

        let mut batch = WriteBatch::default();
        self.stage_delete_videos(&mut batch, std::slice::from_ref(&video))?;
        self.write(batch)?;

        debug!(id = %video.id, "Deleted video");
        Ok(video)
    }

    /// Stage removal of `videos`. Each playlist holding any of them is
    /// rewritten once with all of them taken out.
    pub(super) fn stage_delete_videos(&self, batch: &mut WriteBatch, videos: &[Video]) -> Result<()> {
        for video in videos {
            self.stage_delete(batch, CF_VIDEOS, &video.id.to_string())?;
            self.stage_delete(batch, CF_VIDEOS_BY_OWNER, &pair_key(video.owner, video.id))?;

            for comment in self.comments_for_video(video.id)? {
                self.stage_delete_comment(batch, &comment)?;
            }
            self.stage_delete_likes_for(batch, LikeTarget::Video(video.id))?;
        }

        let doomed: HashSet<Uuid> = videos.iter().map(|video| video.id).collect();
        for mut playlist in self.scan_docs::<Playlist>(CF_PLAYLISTS)? {
            let before = playlist.videos.len();
            playlist.videos.retain(|id| !doomed.contains(id));
            if playlist.videos.len() != before {
                self.stage_doc(batch, CF_PLAYLISTS, playlist.id, &playlist)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::AppError;
    use crate::models::{Comment, LikeTarget, Playlist};
    use uuid::Uuid;

    #[test]
    fn test_video_crud_and_owner_index() {
        let (db, _temp) = create_test_db();
        let owner = Uuid::new_v4();
        let first = video(owner, "first");
        let second = video(owner, "second");
        let foreign = video(Uuid::new_v4(), "foreign");

        for v in [&first, &second, &foreign] {
            db.insert_video(v).unwrap();
        }

        assert_eq!(db.videos_by_owner(owner).unwrap().len(), 2);
        assert_eq!(db.list_videos().unwrap().len(), 3);

        db.modify_video(first.id, |v| {
            v.title = "renamed".to_string();
            Ok(())
        })
        .unwrap();
        assert_eq!(db.get_video(first.id).unwrap().unwrap().title, "renamed");
    }

    #[test]
    fn test_modify_video_keeps_concurrent_views() {
        let (db, _temp) = create_test_db();
        let viewer = user("watcher");
        db.insert_user(&viewer).unwrap();
        let v = video(Uuid::new_v4(), "busy");
        db.insert_video(&v).unwrap();

        // Views counted between an owner's read and write survive the edit
        let stale = db.get_video(v.id).unwrap().unwrap();
        db.record_view(v.id, viewer.id).unwrap();
        db.record_view(v.id, viewer.id).unwrap();
        let published = db
            .modify_video(stale.id, |video| {
                video.is_published = !video.is_published;
                Ok(video.is_published)
            })
            .unwrap();

        let stored = db.get_video(v.id).unwrap().unwrap();
        assert!(!published);
        assert!(!stored.is_published);
        assert_eq!(stored.views, 2);
    }

    #[test]
    fn test_deleted_video_stays_deleted() {
        let (db, _temp) = create_test_db();
        let owner = Uuid::new_v4();
        let viewer = user("late");
        db.insert_user(&viewer).unwrap();
        let v = video(owner, "gone");
        db.insert_video(&v).unwrap();

        let stale = db.get_video(v.id).unwrap().unwrap();
        db.delete_video(v.id).unwrap();

        let err = db
            .modify_video(stale.id, |video| {
                video.title = "revived".to_string();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(db.record_view(stale.id, viewer.id).unwrap().is_none());
        assert!(matches!(db.delete_video(v.id).unwrap_err(), AppError::NotFound(_)));
        assert!(db.get_video(v.id).unwrap().is_none());
        assert!(db.videos_by_owner(owner).unwrap().is_empty());
    }

    #[test]
    fn test_record_view() {
        let (db, _temp) = create_test_db();
        let viewer = user("viewer");
        db.insert_user(&viewer).unwrap();
        let v = video(Uuid::new_v4(), "watched");
        db.insert_video(&v).unwrap();

        db.record_view(v.id, viewer.id).unwrap();
        let updated = db.record_view(v.id, viewer.id).unwrap().unwrap();

        assert_eq!(updated.views, 2);
        assert_eq!(db.get_video(v.id).unwrap().unwrap().views, 2);
        assert_eq!(db.get_user(viewer.id).unwrap().unwrap().watch_history, vec![v.id]);
        assert!(db.record_view(Uuid::new_v4(), viewer.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_video_cascades() {
        let (db, _temp) = create_test_db();
        let owner = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let v = video(owner, "doomed");
        db.insert_video(&v).unwrap();

        let comment = Comment::new("nice".into(), v.id, viewer);
        db.insert_comment(&comment).unwrap();
        db.toggle_like(LikeTarget::Comment(comment.id), viewer).unwrap();
        db.toggle_like(LikeTarget::Video(v.id), viewer).unwrap();

        let mut playlist = Playlist::new("mine".into(), String::new(), viewer);
        playlist.add_video(v.id);
        db.insert_playlist(&playlist).unwrap();

        db.delete_video(v.id).unwrap();

        assert!(db.get_video(v.id).unwrap().is_none());
        assert!(db.videos_by_owner(owner).unwrap().is_empty());
        assert!(db.get_comment(comment.id).unwrap().is_none());
        assert_eq!(db.count_likes(LikeTarget::Video(v.id)).unwrap(), 0);
        assert_eq!(db.count_likes(LikeTarget::Comment(comment.id)).unwrap(), 0);
        assert!(db.liked_by_user(viewer).unwrap().is_empty());
        assert!(db.get_playlist(playlist.id).unwrap().unwrap().videos.is_empty());
    }
}
