//! Read-side joins.
//!
//! Documents reference each other by id only; these helpers resolve owners,
//! counts and per-viewer flags into the shapes handlers return. Items whose
//! owner no longer exists are dropped.

use std::collections::HashMap;
use uuid::Uuid;

use super::DatabaseService;
use crate::error::Result;
use crate::models::{
    normalize_username, ChannelOwner, ChannelProfile, ChannelStats, ChannelSummary, CommentView,
    LikeTarget, TweetView, UserSummary, Video, VideoView,
};

impl DatabaseService {
    /// Owner summaries for `ids`, keyed by user id
    pub fn user_summaries(&self, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, UserSummary>> {
        let mut unique: Vec<Uuid> = ids.into_iter().collect();
        unique.sort();
        unique.dedup();

        Ok(self
            .get_users(&unique)?
            .into_iter()
            .map(|user| (user.id, user.summary()))
            .collect())
    }

    /// Attach owner summaries to `videos`, keeping their order
    pub fn video_views(&self, videos: Vec<Video>) -> Result<Vec<VideoView<UserSummary>>> {
        let owners = self.user_summaries(videos.iter().map(|v| v.owner))?;
        Ok(videos
            .into_iter()
            .filter_map(|video| owners.get(&video.owner).map(|owner| video.view(owner.clone())))
            .collect())
    }

    /// Channel page of `username` as seen by `viewer`
    pub fn channel_profile(&self, username: &str, viewer: Uuid) -> Result<Option<ChannelProfile>> {
        let Some(user) = self.find_user_by_username(&normalize_username(username))? else {
            return Ok(None);
        };

        Ok(Some(ChannelProfile {
            id: user.id,
            subscriber_count: self.count_subscribers(user.id)?,
            subscribed_to_channel_count: self.count_subscriptions(user.id)?,
            is_subscribed: self.is_subscribed(viewer, user.id)?,
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            avatar: user.avatar,
            cover_image: user.cover_image,
        }))
    }

    /// Videos in the user's watch history, most recent first. Deleted
    /// videos are skipped, as are other users' unpublished ones.
    pub fn watch_history(&self, user: Uuid) -> Result<Vec<VideoView<UserSummary>>> {
        let Some(user) = self.get_user(user)? else {
            return Ok(Vec::new());
        };

        let videos: Vec<Video> = self
            .get_videos(&user.watch_history)?
            .into_iter()
            .filter(|video| video.is_visible_to(user.id))
            .collect();
        self.video_views(videos)
    }

    /// Full view of one video for `viewer`
    pub fn video_details(&self, video: &Video, viewer: Uuid) -> Result<Option<VideoView<ChannelOwner>>> {
        let Some(owner) = self.get_user(video.owner)? else {
            return Ok(None);
        };

        let channel = ChannelOwner {
            id: owner.id,
            username: owner.username,
            fullname: owner.fullname,
            avatar: owner.avatar,
            subscribers: self.count_subscribers(video.owner)?,
            is_subscribed: self.is_subscribed(viewer, video.owner)?,
        };

        let target = LikeTarget::Video(video.id);
        Ok(Some(video.view(channel).with_likes(
            self.count_likes(target)?,
            Some(self.is_liked_by(target, viewer)?),
        )))
    }

    /// Comments on `video`, newest first, as seen by `viewer`
    pub fn comment_views(&self, video: Uuid, viewer: Uuid) -> Result<Vec<CommentView>> {
        let comments = self.comments_for_video(video)?;
        let owners = self.user_summaries(comments.iter().map(|c| c.owner))?;

        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let Some(owner) = owners.get(&comment.owner) else {
                continue;
            };
            let target = LikeTarget::Comment(comment.id);
            views.push(comment.view(
                owner.clone(),
                self.count_likes(target)?,
                self.is_liked_by(target, viewer)?,
            ));
        }
        Ok(views)
    }

    /// Tweets of `owner`, newest first, as seen by `viewer`
    pub fn tweet_views(&self, owner: Uuid, viewer: Uuid) -> Result<Vec<TweetView>> {
        let Some(author) = self.get_user(owner)? else {
            return Ok(Vec::new());
        };
        let summary = author.summary();

        let mut views = Vec::new();
        for tweet in self.tweets_by_owner(owner)? {
            let target = LikeTarget::Tweet(tweet.id);
            views.push(tweet.view(
                summary.clone(),
                self.count_likes(target)?,
                self.is_liked_by(target, viewer)?,
            ));
        }
        Ok(views)
    }

    /// Videos `user` liked that are still visible to them, newest like first
    pub fn liked_videos(&self, user: Uuid) -> Result<Vec<VideoView<UserSummary>>> {
        let ids: Vec<Uuid> = self
            .liked_by_user(user)?
            .into_iter()
            .filter_map(|like| match like.target {
                LikeTarget::Video(id) => Some(id),
                _ => None,
            })
            .collect();

        let videos = self
            .get_videos(&ids)?
            .into_iter()
            .filter(|video| video.is_visible_to(user))
            .collect();
        self.video_views(videos)
    }

    /// Channels `subscriber` follows
    pub fn subscribed_channels(&self, subscriber: Uuid) -> Result<Vec<ChannelSummary>> {
        let ids = self.subscriptions_of(subscriber)?;
        let mut channels = Vec::with_capacity(ids.len());
        for user in self.get_users(&ids)? {
            channels.push(ChannelSummary {
                id: user.id,
                subscriber_count: self.count_subscribers(user.id)?,
                username: user.username,
                fullname: user.fullname,
                avatar: user.avatar,
            });
        }
        Ok(channels)
    }

    /// Users subscribed to `channel`
    pub fn channel_subscribers(&self, channel: Uuid) -> Result<Vec<UserSummary>> {
        let ids = self.subscribers_of(channel)?;
        Ok(self
            .get_users(&ids)?
            .iter()
            .map(|user| user.summary())
            .collect())
    }

    /// Totals for the channel dashboard
    pub fn channel_stats(&self, channel: Uuid) -> Result<ChannelStats> {
        let videos = self.videos_by_owner(channel)?;

        let mut total_likes = 0;
        for video in &videos {
            total_likes += self.count_likes(LikeTarget::Video(video.id))?;
        }

        Ok(ChannelStats {
            total_videos: videos.len() as u64,
            total_views: videos.iter().map(|v| v.views).sum(),
            total_subscribers: self.count_subscribers(channel)?,
            total_likes,
            total_tweets: self.tweets_by_owner(channel)?.len() as u64,
        })
    }

    /// All of the channel's videos, newest first, with like counts
    pub fn channel_videos(&self, channel: Uuid) -> Result<Vec<VideoView<Uuid>>> {
        let mut videos = self.videos_by_owner(channel)?;
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut views = Vec::with_capacity(videos.len());
        for video in videos {
            let likes = self.count_likes(LikeTarget::Video(video.id))?;
            views.push(video.view(video.owner).with_likes(likes, None));
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::models::{Comment, LikeTarget, Subscription, Tweet};

    #[test]
    fn test_channel_profile_counts() {
        let (db, _temp) = create_test_db();
        let channel = user("creator");
        let fan = user("fan");
        let other = user("other");
        for u in [&channel, &fan, &other] {
            db.insert_user(u).unwrap();
        }
        db.insert_subscription(&Subscription::new(fan.id, channel.id)).unwrap();
        db.insert_subscription(&Subscription::new(other.id, channel.id)).unwrap();
        db.insert_subscription(&Subscription::new(channel.id, fan.id)).unwrap();

        let profile = db.channel_profile("CREATOR", fan.id).unwrap().unwrap();
        assert_eq!(profile.subscriber_count, 2);
        assert_eq!(profile.subscribed_to_channel_count, 1);
        assert!(profile.is_subscribed);

        let profile = db.channel_profile("creator", channel.id).unwrap().unwrap();
        assert!(!profile.is_subscribed);

        assert!(db.channel_profile("nobody", fan.id).unwrap().is_none());
    }

    #[test]
    fn test_watch_history_order_and_gaps() {
        let (db, _temp) = create_test_db();
        let mut viewer = user("viewer");
        let owner = user("owner");
        db.insert_user(&owner).unwrap();

        let first = video(owner.id, "first");
        let second = video(owner.id, "second");
        let deleted = video(owner.id, "deleted");
        for v in [&first, &second, &deleted] {
            db.insert_video(v).unwrap();
        }
        viewer.record_watch(first.id);
        viewer.record_watch(deleted.id);
        viewer.record_watch(second.id);
        db.insert_user(&viewer).unwrap();
        db.delete_video(deleted.id).unwrap();

        let history = db.watch_history(viewer.id).unwrap();
        let titles: Vec<&str> = history.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(history[0].owner.username, "owner");
    }

    #[test]
    fn test_video_details_flags() {
        let (db, _temp) = create_test_db();
        let owner = user("owner");
        let viewer = user("viewer");
        db.insert_user(&owner).unwrap();
        db.insert_user(&viewer).unwrap();
        let v = video(owner.id, "clip");
        db.insert_video(&v).unwrap();

        db.insert_subscription(&Subscription::new(viewer.id, owner.id)).unwrap();
        db.toggle_like(LikeTarget::Video(v.id), viewer.id).unwrap();

        let details = db.video_details(&v, viewer.id).unwrap().unwrap();
        assert_eq!(details.owner.subscribers, 1);
        assert!(details.owner.is_subscribed);
        assert_eq!(details.likes_count, Some(1));
        assert_eq!(details.is_liked, Some(true));

        let details = db.video_details(&v, owner.id).unwrap().unwrap();
        assert!(!details.owner.is_subscribed);
        assert_eq!(details.is_liked, Some(false));
    }

    #[test]
    fn test_comment_and_tweet_views() {
        let (db, _temp) = create_test_db();
        let author = user("author");
        let reader = user("reader");
        db.insert_user(&author).unwrap();
        db.insert_user(&reader).unwrap();

        let v = video(author.id, "clip");
        db.insert_video(&v).unwrap();
        let comment = Comment::new("great".into(), v.id, author.id);
        db.insert_comment(&comment).unwrap();
        db.toggle_like(LikeTarget::Comment(comment.id), reader.id).unwrap();

        let views = db.comment_views(v.id, reader.id).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].owner.username, "author");
        assert_eq!(views[0].likes_count, 1);
        assert!(views[0].is_liked);

        let tweet = Tweet::new("hello".into(), author.id);
        db.insert_tweet(&tweet).unwrap();
        let tweets = db.tweet_views(author.id, author.id).unwrap();
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].likes_count, 0);
        assert!(!tweets[0].is_liked);
    }

    #[test]
    fn test_channel_stats() {
        let (db, _temp) = create_test_db();
        let owner = user("owner");
        let fan = user("fan");
        db.insert_user(&owner).unwrap();
        db.insert_user(&fan).unwrap();

        let mut a = video(owner.id, "a");
        a.views = 5;
        let mut b = video(owner.id, "b");
        b.views = 7;
        b.is_published = false;
        db.insert_video(&a).unwrap();
        db.insert_video(&b).unwrap();
        db.toggle_like(LikeTarget::Video(a.id), fan.id).unwrap();
        db.toggle_like(LikeTarget::Video(b.id), fan.id).unwrap();
        db.insert_subscription(&Subscription::new(fan.id, owner.id)).unwrap();
        db.insert_tweet(&Tweet::new("news".into(), owner.id)).unwrap();

        let stats = db.channel_stats(owner.id).unwrap();
        assert_eq!(stats.total_videos, 2);
        assert_eq!(stats.total_views, 12);
        assert_eq!(stats.total_subscribers, 1);
        assert_eq!(stats.total_likes, 2);
        assert_eq!(stats.total_tweets, 1);

        assert_eq!(db.channel_videos(owner.id).unwrap().len(), 2);
        assert_eq!(db.liked_videos(fan.id).unwrap().len(), 1);
        assert_eq!(db.subscribed_channels(fan.id).unwrap()[0].subscriber_count, 1);
        assert_eq!(db.channel_subscribers(owner.id).unwrap()[0].username, "fan");
    }
}
