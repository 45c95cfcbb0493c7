//! Document store on RocksDB.
//!
//! RocksDB provides crash safety through its LSM-tree architecture and
//! write-ahead log (WAL). Every record is a JSON document keyed by its UUID;
//! lookups other than by id go through small index column families whose
//! keys are `<owner>:<item>` strings. A record and all of its index entries
//! are always written in one `WriteBatch`.
//!
//! Every change to an existing document re-reads it under the store's write
//! lock and is applied to that fresh copy (`modify_*`), so a handler that
//! awaited an upload or a password hash never writes back an old snapshot.
//! Deletes take the same lock.
//!
//! # Data Organization
//!
//! | column family          | key                       | value          |
//! |------------------------|---------------------------|----------------|
//! | `users`                | user id                   | `User`         |
//! | `user_names`           | username                  | user id        |
//! | `user_emails`          | email                     | user id        |
//! | `videos`               | video id                  | `Video`        |
//! | `videos_by_owner`      | owner:video               | empty          |
//! | `subscriptions`        | subscription id           | `Subscription` |
//! | `subs_by_channel`      | channel:subscriber        | subscription id|
//! | `subs_by_subscriber`   | subscriber:channel        | subscription id|
//! | `comments`             | comment id                | `Comment`      |
//! | `comments_by_video`    | video:comment             | empty          |
//! | `comments_by_owner`    | owner:comment             | empty          |
//! | `likes`                | like id                   | `Like`         |
//! | `likes_by_target`      | kind:target:user          | like id        |
//! | `likes_by_user`        | user:like                 | empty          |
//! | `playlists`            | playlist id               | `Playlist`     |
//! | `playlists_by_owner`   | owner:playlist            | empty          |
//! | `tweets`               | tweet id                  | `Tweet`        |
//! | `tweets_by_owner`      | owner:tweet               | empty          |

mod accounts;
mod aggregates;
mod comments;
mod likes;
mod playlists;
mod subscriptions;
mod tweets;
mod users;
mod videos;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

type DB = DBWithThreadMode<MultiThreaded>;

/// Column family names
const CF_USERS: &str = "users";
const CF_USER_NAMES: &str = "user_names";
const CF_USER_EMAILS: &str = "user_emails";
const CF_VIDEOS: &str = "videos";
const CF_VIDEOS_BY_OWNER: &str = "videos_by_owner";
const CF_SUBSCRIPTIONS: &str = "subscriptions";
const CF_SUBS_BY_CHANNEL: &str = "subs_by_channel";
const CF_SUBS_BY_SUBSCRIBER: &str = "subs_by_subscriber";
const CF_COMMENTS: &str = "comments";
const CF_COMMENTS_BY_VIDEO: &str = "comments_by_video";
const CF_COMMENTS_BY_OWNER: &str = "comments_by_owner";
const CF_LIKES: &str = "likes";
const CF_LIKES_BY_TARGET: &str = "likes_by_target";
const CF_LIKES_BY_USER: &str = "likes_by_user";
const CF_PLAYLISTS: &str = "playlists";
const CF_PLAYLISTS_BY_OWNER: &str = "playlists_by_owner";
const CF_TWEETS: &str = "tweets";
const CF_TWEETS_BY_OWNER: &str = "tweets_by_owner";

const COLUMN_FAMILIES: [&str; 18] = [
    CF_USERS,
    CF_USER_NAMES,
    CF_USER_EMAILS,
    CF_VIDEOS,
    CF_VIDEOS_BY_OWNER,
    CF_SUBSCRIPTIONS,
    CF_SUBS_BY_CHANNEL,
    CF_SUBS_BY_SUBSCRIBER,
    CF_COMMENTS,
    CF_COMMENTS_BY_VIDEO,
    CF_COMMENTS_BY_OWNER,
    CF_LIKES,
    CF_LIKES_BY_TARGET,
    CF_LIKES_BY_USER,
    CF_PLAYLISTS,
    CF_PLAYLISTS_BY_OWNER,
    CF_TWEETS,
    CF_TWEETS_BY_OWNER,
];

/// Database service for all VideoTube documents
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<DB>,
    db_path: PathBuf,
    /// Serializes read-modify-write sequences and cascading deletes
    write_guard: Arc<Mutex<()>>,
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("path", &self.db_path)
            .finish()
    }
}

impl DatabaseService {
    /// Open (or create) the database under `data_dir/rocksdb`
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let db_path = config.database_path();

        std::fs::create_dir_all(&db_path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        opts.set_max_open_files(256);
        opts.set_keep_log_file_num(3);
        opts.set_max_total_wal_size(64 * 1024 * 1024); // 64MB
        opts.set_write_buffer_size(16 * 1024 * 1024); // 16MB
        opts.set_max_write_buffer_number(3);

        let cf_descriptors: Vec<_> = COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                ColumnFamilyDescriptor::new(*name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &db_path, cf_descriptors)
            .map_err(|e| AppError::internal(format!("Failed to open RocksDB: {}", e)))?;

        info!(path = %db_path.display(), "Database initialized (RocksDB)");

        Ok(Self {
            db: Arc::new(db),
            db_path,
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    /// Cheap read used by the readiness probe
    pub fn ping(&self) -> Result<()> {
        self.db.get_cf(&self.cf(CF_USERS)?, Uuid::nil().to_string())?;
        Ok(())
    }

    // =========================================================================
    // Low level helpers shared by the collection modules
    // =========================================================================

    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| AppError::internal(format!("Missing column family: {}", name)))
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get_doc<T: DeserializeOwned>(&self, cf: &'static str, id: Uuid) -> Result<Option<T>> {
        match self.db.get_cf(&self.cf(cf)?, id.to_string())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn stage_doc<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf: &'static str,
        id: Uuid,
        doc: &T,
    ) -> Result<()> {
        let data = serde_json::to_vec(doc)?;
        batch.put_cf(&self.cf(cf)?, id.to_string(), data);
        Ok(())
    }

    /// Re-read document `id` under the write lock, apply `change` and store
    /// the result. 404 with `missing` when the document is gone.
    fn modify_doc<T, R, F>(&self, cf: &'static str, id: Uuid, missing: &str, change: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _guard = self.lock_writes();

        let mut doc: T = self
            .get_doc(cf, id)?
            .ok_or_else(|| AppError::not_found(missing))?;
        let out = change(&mut doc)?;

        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, cf, id, &doc)?;
        self.write(batch)?;
        Ok(out)
    }

    fn stage_put(&self, batch: &mut WriteBatch, cf: &'static str, key: &str, value: &[u8]) -> Result<()> {
        batch.put_cf(&self.cf(cf)?, key, value);
        Ok(())
    }

    fn stage_delete(&self, batch: &mut WriteBatch, cf: &'static str, key: &str) -> Result<()> {
        batch.delete_cf(&self.cf(cf)?, key);
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch)?;
        Ok(())
    }

    /// Value stored under an exact key, read as a UUID
    fn get_id(&self, cf: &'static str, key: &str) -> Result<Option<Uuid>> {
        match self.db.get_cf(&self.cf(cf)?, key)? {
            Some(value) => Ok(Some(Uuid::parse_str(&String::from_utf8_lossy(&value))?)),
            None => Ok(None),
        }
    }

    /// All `(key, value)` pairs whose key starts with `prefix`
    fn scan_prefix(&self, cf: &'static str, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let handle = self.cf(cf)?;
        let iter = self.db.iterator_cf(
            &handle,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            entries.push((String::from_utf8_lossy(&key).into_owned(), value.into_vec()));
        }

        Ok(entries)
    }

    /// Ids encoded as the key suffix of `<prefix>:<uuid>` index entries
    fn index_ids(&self, cf: &'static str, owner: Uuid) -> Result<Vec<Uuid>> {
        let prefix = format!("{}:", owner);
        self.scan_prefix(cf, &prefix)?
            .into_iter()
            .map(|(key, _)| Ok(Uuid::parse_str(&key[prefix.len()..])?))
            .collect()
    }

    /// Number of keys under `prefix`
    fn count_prefix(&self, cf: &'static str, prefix: &str) -> Result<u64> {
        Ok(self.scan_prefix(cf, prefix)?.len() as u64)
    }

    /// Every document in a collection
    fn scan_docs<T: DeserializeOwned>(&self, cf: &'static str) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut docs = Vec::new();
        for item in self.db.iterator_cf(&handle, IteratorMode::Start) {
            let (_, value) = item?;
            docs.push(serde_json::from_slice(&value)?);
        }
        Ok(docs)
    }

    /// Load documents for `ids`, silently skipping missing ones
    fn get_docs<T: DeserializeOwned>(&self, cf: &'static str, ids: &[Uuid]) -> Result<Vec<T>> {
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get_doc(cf, *id)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

fn pair_key(a: Uuid, b: Uuid) -> String {
    format!("{}:{}", a, b)
}
