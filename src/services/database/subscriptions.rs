//! Subscription documents with both-direction pair indexes.

use rocksdb::WriteBatch;
use tracing::debug;
use uuid::Uuid;

use super::{
    pair_key, DatabaseService, CF_SUBSCRIPTIONS, CF_SUBS_BY_CHANNEL, CF_SUBS_BY_SUBSCRIBER,
};
use crate::error::Result;
use crate::models::Subscription;

impl DatabaseService {
    pub fn find_subscription(&self, subscriber: Uuid, channel: Uuid) -> Result<Option<Subscription>> {
        match self.get_id(CF_SUBS_BY_CHANNEL, &pair_key(channel, subscriber))? {
            Some(id) => self.get_doc(CF_SUBSCRIPTIONS, id),
            None => Ok(None),
        }
    }

    pub fn is_subscribed(&self, subscriber: Uuid, channel: Uuid) -> Result<bool> {
        Ok(self
            .get_id(CF_SUBS_BY_CHANNEL, &pair_key(channel, subscriber))?
            .is_some())
    }

    /// Insert unless the pair already exists; returns whether it was inserted
    pub fn insert_subscription(&self, subscription: &Subscription) -> Result<bool> {
        let _guard = self.lock_writes();

        if self.is_subscribed(subscription.subscriber, subscription.channel)? {
            return Ok(false);
        }

        let id = subscription.id.to_string();
        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, CF_SUBSCRIPTIONS, subscription.id, subscription)?;
        self.stage_put(
            &mut batch,
            CF_SUBS_BY_CHANNEL,
            &pair_key(subscription.channel, subscription.subscriber),
            id.as_bytes(),
        )?;
        self.stage_put(
            &mut batch,
            CF_SUBS_BY_SUBSCRIBER,
            &pair_key(subscription.subscriber, subscription.channel),
            id.as_bytes(),
        )?;
        self.write(batch)?;

        debug!(
            subscriber = %subscription.subscriber,
            channel = %subscription.channel,
            "Inserted subscription"
        );
        Ok(true)
    }

    /// Remove the pair; returns whether it existed
    pub fn delete_subscription(&self, subscriber: Uuid, channel: Uuid) -> Result<bool> {
        let _guard = self.lock_writes();

        let Some(subscription) = self.find_subscription(subscriber, channel)? else {
            return Ok(false);
        };

        let mut batch = WriteBatch::default();
        self.stage_delete_subscription(&mut batch, &subscription)?;
        self.write(batch)?;
        Ok(true)
    }

    /// Users subscribed to `channel`
    pub fn subscribers_of(&self, channel: Uuid) -> Result<Vec<Uuid>> {
        self.index_ids(CF_SUBS_BY_CHANNEL, channel)
    }

    /// Channels `subscriber` follows
    pub fn subscriptions_of(&self, subscriber: Uuid) -> Result<Vec<Uuid>> {
        self.index_ids(CF_SUBS_BY_SUBSCRIBER, subscriber)
    }

    pub fn count_subscribers(&self, channel: Uuid) -> Result<u64> {
        self.count_prefix(CF_SUBS_BY_CHANNEL, &format!("{}:", channel))
    }

    pub fn count_subscriptions(&self, subscriber: Uuid) -> Result<u64> {
        self.count_prefix(CF_SUBS_BY_SUBSCRIBER, &format!("{}:", subscriber))
    }

    fn stage_delete_subscription(&self, batch: &mut WriteBatch, subscription: &Subscription) -> Result<()> {
        self.stage_delete(batch, CF_SUBSCRIPTIONS, &subscription.id.to_string())?;
        self.stage_delete(
            batch,
            CF_SUBS_BY_CHANNEL,
            &pair_key(subscription.channel, subscription.subscriber),
        )?;
        self.stage_delete(
            batch,
            CF_SUBS_BY_SUBSCRIBER,
            &pair_key(subscription.subscriber, subscription.channel),
        )
    }

    /// Stage removal of every subscription `user` takes part in, either side
    pub(super) fn stage_delete_subscriptions_of(&self, batch: &mut WriteBatch, user: Uuid) -> Result<()> {
        for channel in self.subscriptions_of(user)? {
            if let Some(subscription) = self.find_subscription(user, channel)? {
                self.stage_delete_subscription(batch, &subscription)?;
            }
        }
        for subscriber in self.subscribers_of(user)? {
            if let Some(subscription) = self.find_subscription(subscriber, user)? {
                self.stage_delete_subscription(batch, &subscription)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::models::Subscription;
    use uuid::Uuid;

    #[test]
    fn test_subscribe_is_unique_per_pair() {
        let (db, _temp) = create_test_db();
        let fan = Uuid::new_v4();
        let channel = Uuid::new_v4();

        assert!(db.insert_subscription(&Subscription::new(fan, channel)).unwrap());
        assert!(!db.insert_subscription(&Subscription::new(fan, channel)).unwrap());

        assert!(db.is_subscribed(fan, channel).unwrap());
        assert!(!db.is_subscribed(channel, fan).unwrap());
        assert_eq!(db.count_subscribers(channel).unwrap(), 1);
        assert_eq!(db.count_subscriptions(fan).unwrap(), 1);
        assert_eq!(db.subscribers_of(channel).unwrap(), vec![fan]);
        assert_eq!(db.subscriptions_of(fan).unwrap(), vec![channel]);
    }

    #[test]
    fn test_unsubscribe() {
        let (db, _temp) = create_test_db();
        let fan = Uuid::new_v4();
        let channel = Uuid::new_v4();
        db.insert_subscription(&Subscription::new(fan, channel)).unwrap();

        assert!(db.delete_subscription(fan, channel).unwrap());
        assert!(!db.delete_subscription(fan, channel).unwrap());
        assert_eq!(db.count_subscribers(channel).unwrap(), 0);
        assert!(db.subscriptions_of(fan).unwrap().is_empty());
    }
}
