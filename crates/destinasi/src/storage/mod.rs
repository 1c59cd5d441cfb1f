//! Storage layer for destinasi.
//!
//! This module provides `SQLite`-based persistent storage for users,
//! sessions, categories, destinations and testimonials. Queries for each
//! entity live in their own submodule as further `impl Storage` blocks.

mod categories;
mod destinations;
pub mod migrations;
pub mod schema;
mod sessions;
mod testimonials;
mod users;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::listing::{Page, ResolvedQuery};
use crate::validation::References;

pub use destinations::CatalogFilter;

/// Storage engine for the catalog.
///
/// Wraps a single `SQLite` connection with foreign keys enforced. The HTTP
/// layer shares one instance behind a mutex.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Row counts and file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?)
        };

        let published_destinations: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM destinations WHERE published = 1",
            [],
            |row| row.get(0),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            users: count("users")?,
            categories: count("categories")?,
            destinations: count("destinations")?,
            published_destinations,
            testimonials: count("testimonials")?,
            sessions: count("sessions")?,
            schema_version: migrations::get_schema_version(&self.conn)?,
            db_size_bytes,
        })
    }

    /// Run a counted, ordered, paginated query.
    ///
    /// `conditions` are AND-combined with the search condition from `query`.
    /// `params` bind the `?` placeholders in `conditions`, in order.
    pub(crate) fn paginate<T, F>(
        &self,
        select: &str,
        from: &str,
        mut conditions: Vec<String>,
        mut params: Vec<Value>,
        query: &ResolvedQuery,
        map: F,
    ) -> Result<Page<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        if let Some((clause, search_params)) = query.search_condition() {
            conditions.push(clause);
            params.extend(search_params);
        }
        let where_sql = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {from} {where_sql}"),
            params_from_iter(params.iter()),
            |row| row.get(0),
        )?;

        let (limit, offset) = query.limit_offset();
        params.push(Value::Integer(limit));
        params.push(Value::Integer(offset));
        let sql = format!(
            "{select} FROM {from} {where_sql} {} LIMIT ? OFFSET ?",
            query.order_clause()
        );
        debug!("Paginated query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(
            rows,
            query.page,
            query.per_page,
            u64::try_from(total).unwrap_or(0),
        ))
    }
}

impl References for Storage {
    fn user_exists(&self, id: i64) -> Result<bool> {
        Storage::user_exists(self, id)
    }

    fn missing_categories(&self, ids: &[i64]) -> Result<Vec<i64>> {
        Storage::missing_categories(self, ids)
    }

    fn destination_exists(&self, id: &str) -> Result<bool> {
        Storage::destination_exists(self, id)
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool> {
        Storage::email_taken(self, email, except)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of user accounts.
    pub users: i64,
    /// Number of categories.
    pub categories: i64,
    /// Number of destinations.
    pub destinations: i64,
    /// Number of published destinations.
    pub published_destinations: i64,
    /// Number of testimonials.
    pub testimonials: i64,
    /// Number of live and expired sessions.
    pub sessions: i64,
    /// Schema version recorded in `metadata`.
    pub schema_version: i32,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Format a timestamp for storage. Fixed width keeps text order equal to
/// time order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time, formatted for storage.
pub(crate) fn now() -> String {
    timestamp(Utc::now())
}

/// Read a stored timestamp column.
pub(crate) fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// `?, ?, ?` with `n` placeholders.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{CategoryDraft, DestinationDraft, Role, TestimonialDraft, UserDraft};

    pub(crate) fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    pub(crate) fn add_user(storage: &Storage, email: &str, role: Role) -> i64 {
        storage
            .create_user(&UserDraft {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                password_hash: Some("not-a-real-hash".to_string()),
                role,
                phone_number: None,
            })
            .unwrap()
            .id
    }

    pub(crate) fn add_category(storage: &Storage, name: &str) -> i64 {
        storage
            .create_category(&CategoryDraft {
                name: name.to_string(),
                img: None,
            })
            .unwrap()
            .id
    }

    pub(crate) fn destination_draft(pic_id: i64, name: &str, categories: Vec<i64>) -> DestinationDraft {
        DestinationDraft {
            pic_id,
            name: name.to_string(),
            thumb_image: Some(format!("https://ik.imagekit.io/demo/{name}.jpg")),
            imagekit_file_id: None,
            content: format!("About {name}"),
            facility: "Parking".to_string(),
            lat: 0.0,
            lon: 109.0,
            address: None,
            operating_hours: None,
            published: true,
            categories,
        }
    }

    pub(crate) fn add_destination(storage: &Storage, pic_id: i64, name: &str, categories: Vec<i64>) -> String {
        storage
            .create_destination(&destination_draft(pic_id, name, categories))
            .unwrap()
            .id
    }

    pub(crate) fn add_testimonial(storage: &Storage, destination_id: &str, rating: u8) -> i64 {
        storage
            .create_testimonial(&TestimonialDraft {
                destination_id: destination_id.to_string(),
                name: "Visitor".to_string(),
                comment: "Nice".to_string(),
                rating,
            })
            .unwrap()
            .id
    }
}
