//! User account queries.

use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::{now, parse_timestamp, Storage};
use crate::error::{Error, Result};
use crate::listing::{ListQuery, ListSpec, Listing, SortDirection};
use crate::models::{Role, User, UserDraft};

const USER_COLUMNS: &str =
    "SELECT id, name, email, role, phone_number, created_at, updated_at";

/// Searchable and sortable columns for the user list.
pub const USER_LIST: ListSpec = ListSpec {
    searchable: &["name", "email", "role", "phone_number"],
    sortable: &[
        ("id", "id"),
        ("name", "name"),
        ("email", "email"),
        ("role", "role"),
        ("phone_number", "phone_number"),
        ("created_at", "created_at"),
        ("updated_at", "updated_at"),
    ],
    default_sort: "id",
    default_direction: SortDirection::Desc,
    tiebreak: "id",
};

impl Storage {
    /// Insert a user. The draft must carry a password hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is missing or the insert fails, including
    /// on a duplicate email.
    pub fn create_user(&self, draft: &UserDraft) -> Result<User> {
        let hash = draft
            .password_hash
            .as_deref()
            .ok_or_else(|| Error::invalid("password", "The password field is required."))?;
        let ts = now();

        self.conn.execute(
            r"
            INSERT INTO users (name, email, password_hash, role, phone_number, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ",
            params![
                draft.name,
                draft.email,
                hash,
                draft.role.as_str(),
                draft.phone_number,
                ts,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!("Created user {} ({})", id, draft.role);
        self.get_user(id)?
            .ok_or_else(|| Error::internal("user vanished after insert"))
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by email, together with the stored password hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let found = self
            .conn
            .query_row(
                &format!("{USER_COLUMNS}, password_hash FROM users WHERE email = ?1 COLLATE NOCASE"),
                [email],
                |row| Ok((Self::row_to_user(row)?, row.get::<_, String>(7)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// Update a user. A draft without a password hash keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user does not exist, or a database
    /// error.
    pub fn update_user(&self, id: i64, draft: &UserDraft) -> Result<User> {
        let ts = now();
        let changed = match &draft.password_hash {
            Some(hash) => self.conn.execute(
                r"
                UPDATE users SET name = ?1, email = ?2, role = ?3, phone_number = ?4,
                    password_hash = ?5, updated_at = ?6
                WHERE id = ?7
                ",
                params![
                    draft.name,
                    draft.email,
                    draft.role.as_str(),
                    draft.phone_number,
                    hash,
                    ts,
                    id
                ],
            )?,
            None => self.conn.execute(
                r"
                UPDATE users SET name = ?1, email = ?2, role = ?3, phone_number = ?4,
                    updated_at = ?5
                WHERE id = ?6
                ",
                params![
                    draft.name,
                    draft.email,
                    draft.role.as_str(),
                    draft.phone_number,
                    ts,
                    id
                ],
            )?,
        };
        if changed == 0 {
            return Err(Error::not_found("user", id));
        }

        info!("Updated user {}", id);
        self.get_user(id)?.ok_or_else(|| Error::not_found("user", id))
    }

    /// Delete a user. Their sessions go with them.
    ///
    /// Fails with a database error while the user is still PIC of a
    /// destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        if deleted > 0 {
            info!("Deleted user {}", id);
        }
        Ok(deleted > 0)
    }

    /// One page of users.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self, query: &ListQuery) -> Result<Listing<User>> {
        let resolved = USER_LIST.resolve(query);
        let page = self.paginate(
            USER_COLUMNS,
            "users",
            Vec::new(),
            Vec::<Value>::new(),
            &resolved,
            Self::row_to_user,
        )?;
        Ok(Listing {
            page,
            filters: resolved.filters(),
        })
    }

    /// Every user, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_COLUMNS} FROM users ORDER BY name ASC, id ASC"))?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Whether a user with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn user_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether any user other than `except` already has this email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE AND id != ?2",
            params![email, except.unwrap_or(-1)],
            |row| row.get(0),
        )?;
        debug!("Email uniqueness check matched {} rows", count);
        Ok(count > 0)
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
        let role_str: String = row.get(3)?;
        let role = role_str.parse::<Role>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;

        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role,
            phone_number: row.get(4)?,
            created_at: parse_timestamp(row, 5)?,
            updated_at: parse_timestamp(row, 6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::listing::ListQuery;
    use crate::models::{Role, UserDraft};

    fn draft(email: &str) -> UserDraft {
        UserDraft {
            name: "Sari".to_string(),
            email: email.to_string(),
            password_hash: Some("hash-1".to_string()),
            role: Role::Admin,
            phone_number: Some("0812".to_string()),
        }
    }

    #[test]
    fn test_create_and_get_user() {
        let storage = create_test_storage();
        let user = storage.create_user(&draft("sari@example.com")).unwrap();
        assert_eq!(user.role, Role::Admin);

        let fetched = storage.get_user(user.id).unwrap().unwrap();
        assert_eq!(fetched, user);
        assert!(storage.get_user(999).unwrap().is_none());
    }

    #[test]
    fn test_create_user_requires_hash() {
        let storage = create_test_storage();
        let mut d = draft("x@example.com");
        d.password_hash = None;
        assert!(storage.create_user(&d).unwrap_err().is_validation());
    }

    #[test]
    fn test_duplicate_email_is_a_database_error() {
        let storage = create_test_storage();
        storage.create_user(&draft("dup@example.com")).unwrap();
        let err = storage.create_user(&draft("dup@example.com")).unwrap_err();
        assert!(matches!(err, crate::error::Error::DatabaseQuery(_)));
    }

    #[test]
    fn test_get_user_by_email_returns_hash() {
        let storage = create_test_storage();
        storage.create_user(&draft("sari@example.com")).unwrap();
        let (user, hash) = storage
            .get_user_by_email("SARI@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(user.email, "sari@example.com");
        assert_eq!(hash, "hash-1");
    }

    #[test]
    fn test_update_user_keeps_password_when_absent() {
        let storage = create_test_storage();
        let user = storage.create_user(&draft("sari@example.com")).unwrap();

        let mut d = draft("sari@example.com");
        d.name = "Sari Dewi".to_string();
        d.password_hash = None;
        d.role = Role::Superadmin;
        let updated = storage.update_user(user.id, &d).unwrap();
        assert_eq!(updated.name, "Sari Dewi");
        assert_eq!(updated.role, Role::Superadmin);

        let (_, hash) = storage.get_user_by_email("sari@example.com").unwrap().unwrap();
        assert_eq!(hash, "hash-1");
    }

    #[test]
    fn test_update_missing_user() {
        let storage = create_test_storage();
        let err = storage.update_user(42, &draft("a@example.com")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_email_taken_ignores_self() {
        let storage = create_test_storage();
        let user = storage.create_user(&draft("sari@example.com")).unwrap();
        assert!(storage.email_taken("sari@example.com", None).unwrap());
        assert!(!storage.email_taken("sari@example.com", Some(user.id)).unwrap());
        assert!(!storage.email_taken("other@example.com", None).unwrap());
    }

    #[test]
    fn test_delete_user() {
        let storage = create_test_storage();
        let id = add_user(&storage, "gone@example.com", Role::Admin);
        assert!(storage.delete_user(id).unwrap());
        assert!(!storage.delete_user(id).unwrap());
        assert!(!storage.user_exists(id).unwrap());
    }

    #[test]
    fn test_delete_user_with_destinations_fails() {
        let storage = create_test_storage();
        let id = add_user(&storage, "pic@example.com", Role::Admin);
        add_destination(&storage, id, "Pantai Pasir Panjang", Vec::new());
        assert!(storage.delete_user(id).is_err());
    }

    #[test]
    fn test_list_users_search_and_default_sort() {
        let storage = create_test_storage();
        add_user(&storage, "andi@example.com", Role::Admin);
        add_user(&storage, "budi@example.com", Role::Superadmin);
        add_user(&storage, "citra@example.com", Role::Admin);

        let listing = storage.list_users(&ListQuery::default()).unwrap();
        assert_eq!(listing.page.total, 3);
        assert_eq!(listing.page.data[0].email, "citra@example.com");
        assert_eq!(listing.filters.sort_field, "id");

        let listing = storage
            .list_users(&ListQuery {
                search: Some("superadmin".to_string()),
                ..ListQuery::default()
            })
            .unwrap();
        assert_eq!(listing.page.total, 1);
        assert_eq!(listing.page.data[0].email, "budi@example.com");
    }

    #[test]
    fn test_all_users_sorted_by_name() {
        let storage = create_test_storage();
        add_user(&storage, "zed@example.com", Role::Admin);
        add_user(&storage, "amir@example.com", Role::Admin);
        let names: Vec<_> = storage
            .all_users()
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["amir", "zed"]);
    }
}
