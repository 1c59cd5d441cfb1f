//! Login session queries. Tokens are stored hashed.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{now, timestamp, Storage};
use crate::error::Result;
use crate::models::User;

impl Storage {
    /// Record a session for a token hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![token_hash, user_id, now(), timestamp(expires_at)],
        )?;
        debug!("Created session for user {}", user_id);
        Ok(())
    }

    /// The user behind an unexpired session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_for_session(&self, token_hash: &str) -> Result<Option<User>> {
        let user_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
                params![token_hash, now()],
                |row| row.get(0),
            )
            .optional()?;

        match user_id {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }

    /// Revoke a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
        Ok(deleted > 0)
    }

    /// Delete every expired session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1", [now()])?;
        if deleted > 0 {
            info!("Purged {} expired sessions", deleted);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::super::test_support::*;
    use crate::models::Role;

    #[test]
    fn test_session_resolves_user() {
        let storage = create_test_storage();
        let id = add_user(&storage, "a@example.com", Role::Admin);
        storage
            .create_session("h1", id, Utc::now() + Duration::hours(1))
            .unwrap();

        let user = storage.user_for_session("h1").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(storage.user_for_session("other").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_ignored_and_purged() {
        let storage = create_test_storage();
        let id = add_user(&storage, "a@example.com", Role::Admin);
        storage
            .create_session("old", id, Utc::now() - Duration::minutes(1))
            .unwrap();
        storage
            .create_session("new", id, Utc::now() + Duration::hours(1))
            .unwrap();

        assert!(storage.user_for_session("old").unwrap().is_none());
        assert_eq!(storage.purge_expired_sessions().unwrap(), 1);
        assert_eq!(storage.stats().unwrap().sessions, 1);
    }

    #[test]
    fn test_delete_session() {
        let storage = create_test_storage();
        let id = add_user(&storage, "a@example.com", Role::Admin);
        storage
            .create_session("h1", id, Utc::now() + Duration::hours(1))
            .unwrap();
        assert!(storage.delete_session("h1").unwrap());
        assert!(!storage.delete_session("h1").unwrap());
        assert!(storage.user_for_session("h1").unwrap().is_none());
    }

    #[test]
    fn test_sessions_deleted_with_user() {
        let storage = create_test_storage();
        let id = add_user(&storage, "a@example.com", Role::Admin);
        storage
            .create_session("h1", id, Utc::now() + Duration::hours(1))
            .unwrap();
        storage.delete_user(id).unwrap();
        assert_eq!(storage.stats().unwrap().sessions, 0);
    }
}
