//! Playlist documents, indexed by owner.

use rocksdb::WriteBatch;
use tracing::debug;
use uuid::Uuid;

use super::{pair_key, DatabaseService, CF_PLAYLISTS, CF_PLAYLISTS_BY_OWNER};
use crate::error::{AppError, Result};
use crate::models::Playlist;

impl DatabaseService {
    pub fn insert_playlist(&self, playlist: &Playlist) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, CF_PLAYLISTS, playlist.id, playlist)?;
        self.stage_put(
            &mut batch,
            CF_PLAYLISTS_BY_OWNER,
            &pair_key(playlist.owner, playlist.id),
            &[],
        )?;
        self.write(batch)?;

        debug!(id = %playlist.id, owner = %playlist.owner, "Inserted playlist");
        Ok(())
    }

    pub fn get_playlist(&self, id: Uuid) -> Result<Option<Playlist>> {
        self.get_doc(CF_PLAYLISTS, id)
    }

    /// Apply `change` to the stored playlist under the write lock
    pub fn modify_playlist<R, F>(&self, id: Uuid, change: F) -> Result<R>
    where
        F: FnOnce(&mut Playlist) -> Result<R>,
    {
        self.modify_doc(CF_PLAYLISTS, id, "Playlist not found", change)
    }

    /// Playlists owned by `owner`, newest first
    pub fn playlists_by_owner(&self, owner: Uuid) -> Result<Vec<Playlist>> {
        let ids = self.index_ids(CF_PLAYLISTS_BY_OWNER, owner)?;
        let mut playlists: Vec<Playlist> = self.get_docs(CF_PLAYLISTS, &ids)?;
        playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(playlists)
    }

    pub fn delete_playlist(&self, id: Uuid) -> Result<()> {
        let _guard = self.lock_writes();

        let playlist = self
            .get_playlist(id)?
            .ok_or_else(|| AppError::not_found("Playlist not found"))?;

        let mut batch = WriteBatch::default();
        self.stage_delete_playlist(&mut batch, &playlist)?;
        self.write(batch)
    }

    pub(super) fn stage_delete_playlist(&self, batch: &mut WriteBatch, playlist: &Playlist) -> Result<()> {
        self.stage_delete(batch, CF_PLAYLISTS, &playlist.id.to_string())?;
        self.stage_delete(batch, CF_PLAYLISTS_BY_OWNER, &pair_key(playlist.owner, playlist.id))
    }
}
