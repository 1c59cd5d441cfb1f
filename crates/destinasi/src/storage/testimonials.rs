//! Testimonial queries.

use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::{now, parse_timestamp, Storage};
use crate::error::{Error, Result};
use crate::listing::{ListQuery, ListSpec, Listing, SortDirection};
use crate::models::{DestinationOption, Testimonial, TestimonialDraft};

const TESTIMONIAL_SELECT: &str = r"
SELECT t.id, t.destination_id, t.name, t.comment, t.rating, t.created_at, t.updated_at,
       d.name, d.pic_id";

const TESTIMONIAL_FROM: &str = "testimonials t JOIN destinations d ON d.id = t.destination_id";

/// Searchable and sortable columns for the admin testimonial list.
pub const TESTIMONIAL_LIST: ListSpec = ListSpec {
    searchable: &["t.comment", "t.rating"],
    sortable: &[
        ("id", "t.id"),
        ("destination_id", "t.destination_id"),
        ("comment", "t.comment"),
        ("rating", "t.rating"),
        ("created_at", "t.created_at"),
        ("updated_at", "t.updated_at"),
    ],
    default_sort: "id",
    default_direction: SortDirection::Desc,
    tiebreak: "t.id",
};

impl Storage {
    /// Insert a testimonial.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including when the destination
    /// does not exist.
    pub fn create_testimonial(&self, draft: &TestimonialDraft) -> Result<Testimonial> {
        let ts = now();
        self.conn.execute(
            r"
            INSERT INTO testimonials (destination_id, name, comment, rating, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ",
            params![draft.destination_id, draft.name, draft.comment, draft.rating, ts],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(
            "Created testimonial {} on destination {}",
            id, draft.destination_id
        );
        self.get_testimonial(id)?
            .ok_or_else(|| Error::internal("testimonial vanished after insert"))
    }

    /// Get a testimonial with its destination reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_testimonial(&self, id: i64) -> Result<Option<Testimonial>> {
        let testimonial = self
            .conn
            .query_row(
                &format!("{TESTIMONIAL_SELECT} FROM {TESTIMONIAL_FROM} WHERE t.id = ?1"),
                [id],
                Self::row_to_testimonial,
            )
            .optional()?;
        Ok(testimonial)
    }

    /// Update a testimonial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the testimonial does not exist, or a
    /// database error.
    pub fn update_testimonial(&self, id: i64, draft: &TestimonialDraft) -> Result<Testimonial> {
        let changed = self.conn.execute(
            r"
            UPDATE testimonials SET destination_id = ?1, name = ?2, comment = ?3, rating = ?4,
                updated_at = ?5
            WHERE id = ?6
            ",
            params![
                draft.destination_id,
                draft.name,
                draft.comment,
                draft.rating,
                now(),
                id
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("testimonial", id));
        }
        info!("Updated testimonial {}", id);
        self.get_testimonial(id)?
            .ok_or_else(|| Error::not_found("testimonial", id))
    }

    /// Delete a testimonial.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_testimonial(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM testimonials WHERE id = ?1", [id])?;
        if deleted > 0 {
            info!("Deleted testimonial {}", id);
        }
        Ok(deleted > 0)
    }

    /// One page of testimonials. `scope` limits the list to destinations of
    /// one PIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_testimonials(
        &self,
        query: &ListQuery,
        scope: Option<i64>,
    ) -> Result<Listing<Testimonial>> {
        let resolved = TESTIMONIAL_LIST.resolve(query);
        let (conditions, params) = match scope {
            Some(pic_id) => (vec!["d.pic_id = ?".to_string()], vec![Value::Integer(pic_id)]),
            None => (Vec::new(), Vec::new()),
        };
        let page = self.paginate(
            TESTIMONIAL_SELECT,
            TESTIMONIAL_FROM,
            conditions,
            params,
            &resolved,
            Self::row_to_testimonial,
        )?;
        Ok(Listing {
            page,
            filters: resolved.filters(),
        })
    }

    /// Testimonials on one destination, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn testimonials_for_destination(&self, destination_id: &str) -> Result<Vec<Testimonial>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TESTIMONIAL_SELECT} FROM {TESTIMONIAL_FROM} WHERE t.destination_id = ?1 ORDER BY t.created_at DESC, t.id DESC"
        ))?;
        let testimonials = stmt
            .query_map([destination_id], Self::row_to_testimonial)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(testimonials)
    }

    /// Every testimonial, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_testimonials(&self) -> Result<Vec<Testimonial>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TESTIMONIAL_SELECT} FROM {TESTIMONIAL_FROM} ORDER BY t.id ASC"
        ))?;
        let testimonials = stmt
            .query_map([], Self::row_to_testimonial)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(testimonials)
    }

    fn row_to_testimonial(row: &Row<'_>) -> rusqlite::Result<Testimonial> {
        let destination_id: String = row.get(1)?;
        Ok(Testimonial {
            id: row.get(0)?,
            destination: Some(DestinationOption {
                id: destination_id.clone(),
                name: row.get(7)?,
                pic_id: row.get(8)?,
            }),
            destination_id,
            name: row.get(2)?,
            comment: row.get(3)?,
            rating: row.get(4)?,
            created_at: parse_timestamp(row, 5)?,
            updated_at: parse_timestamp(row, 6)?,
        })
    }
}
