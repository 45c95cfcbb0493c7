//! Channel subscription entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `subscriber` follows `channel`; the pair is unique
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub subscriber: Uuid,
    pub channel: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(subscriber: Uuid, channel: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscriber,
            channel,
            created_at: Utc::now(),
        }
    }
}

/// Data of subscribe / unsubscribe responses
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_subscribed: bool,
}
