//! User documents and the username / email unique indexes.

use rocksdb::WriteBatch;
use tracing::debug;
use uuid::Uuid;

use super::{DatabaseService, CF_USERS, CF_USER_EMAILS, CF_USER_NAMES};
use crate::error::{AppError, Result};
use crate::models::{normalize_email, normalize_username, User};

impl DatabaseService {
    /// Insert a new user; 409 if the username or email is taken
    pub fn insert_user(&self, user: &User) -> Result<()> {
        let _guard = self.lock_writes();

        if self.get_id(CF_USER_NAMES, &user.username)?.is_some()
            || self.get_id(CF_USER_EMAILS, &user.email)?.is_some()
        {
            return Err(AppError::conflict("Username or email already exist!"));
        }

        let id = user.id.to_string();
        let mut batch = WriteBatch::default();
        self.stage_doc(&mut batch, CF_USERS, user.id, user)?;
        self.stage_put(&mut batch, CF_USER_NAMES, &user.username, id.as_bytes())?;
        self.stage_put(&mut batch, CF_USER_EMAILS, &user.email, id.as_bytes())?;
        self.write(batch)?;

        debug!(id = %user.id, username = %user.username, "Inserted user");
        Ok(())
    }

    /// Get a user by ID
    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.get_doc(CF_USERS, id)
    }

    /// Case-insensitive lookup by username
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.get_id(CF_USER_NAMES, &normalize_username(username))? {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }

    /// Case-insensitive lookup by email
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.get_id(CF_USER_EMAILS, &normalize_email(email))? {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }

    /// Load several users, skipping ids that no longer exist
    pub fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        self.get_docs(CF_USERS, ids)
    }

    /// Apply `change` to the stored user under the write lock, moving index
    /// entries when the username or email changed. 404 if the user is gone.
    pub fn modify_user<R, F>(&self, id: Uuid, change: F) -> Result<R>
    where
        F: FnOnce(&mut User) -> Result<R>,
    {
        let _guard = self.lock_writes();

        let old = self
            .get_user(id)?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        let mut user = old.clone();
        let out = change(&mut user)?;

        let key = id.to_string();
        let mut batch = WriteBatch::default();

        if old.username != user.username {
            if self.get_id(CF_USER_NAMES, &user.username)?.is_some() {
                return Err(AppError::conflict("Username already in use"));
            }
            self.stage_delete(&mut batch, CF_USER_NAMES, &old.username)?;
            self.stage_put(&mut batch, CF_USER_NAMES, &user.username, key.as_bytes())?;
        }

        if old.email != user.email {
            if self.get_id(CF_USER_EMAILS, &user.email)?.is_some() {
                return Err(AppError::conflict("Email already in use"));
            }
            self.stage_delete(&mut batch, CF_USER_EMAILS, &old.email)?;
            self.stage_put(&mut batch, CF_USER_EMAILS, &user.email, key.as_bytes())?;
        }

        self.stage_doc(&mut batch, CF_USERS, id, &user)?;
        self.write(batch)?;

        debug!(id = %id, "Updated user");
        Ok(out)
    }

    pub(super) fn stage_delete_user(&self, batch: &mut WriteBatch, user: &User) -> Result<()> {
        self.stage_delete(batch, CF_USERS, &user.id.to_string())?;
        self.stage_delete(batch, CF_USER_NAMES, &user.username)?;
        self.stage_delete(batch, CF_USER_EMAILS, &user.email)?;
        Ok(())
    }
}
