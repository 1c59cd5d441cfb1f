//! Destination queries.
//!
//! Ratings are aggregated from `testimonials` in the same statement that
//! loads the destination; nothing derived is ever written back.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::{now, parse_timestamp, placeholders, Storage};
use crate::error::{Error, Result};
use crate::listing::{escape_like, ListQuery, ListSpec, Listing, SortDirection};
use crate::models::{Destination, DestinationDraft, DestinationOption, UserSummary};

const DESTINATION_SELECT: &str = r"
SELECT d.id, d.pic_id, d.name, d.thumb_image, d.imagekit_file_id, d.content, d.facility,
       d.lat, d.lon, d.address, d.operating_hours, d.published, d.created_at, d.updated_at,
       COALESCE(r.avg_rating, 0), COALESCE(r.total_reviews, 0),
       u.name, u.email";

const DESTINATION_FROM: &str = r"
destinations d
LEFT JOIN users u ON u.id = d.pic_id
LEFT JOIN (
    SELECT destination_id, ROUND(AVG(rating), 1) AS avg_rating, COUNT(*) AS total_reviews
    FROM testimonials
    GROUP BY destination_id
) r ON r.destination_id = d.id";

/// Creation order, oldest first.
const NATURAL_ORDER: &str = "d.created_at ASC, d.rowid ASC";

/// Searchable and sortable columns for the admin destination list.
pub const DESTINATION_LIST: ListSpec = ListSpec {
    searchable: &["d.name", "d.content", "d.facility"],
    sortable: &[
        ("id", "d.id"),
        ("name", "d.name"),
        ("pic_id", "d.pic_id"),
        ("published", "d.published"),
        ("created_at", "d.created_at"),
        ("updated_at", "d.updated_at"),
    ],
    default_sort: "created_at",
    default_direction: SortDirection::Desc,
    tiebreak: "d.rowid",
};

/// Filters for the public catalog queries. Only published destinations are
/// ever returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// Substring matched against name, content, facility and address.
    pub search: Option<String>,
    /// Only destinations in this category.
    pub category: Option<i64>,
    /// Only destinations whose rounded average rating is at least this.
    pub min_rating: Option<f64>,
    /// Only destinations sharing at least one of these categories.
    pub any_category: Vec<i64>,
    /// Leave this destination out.
    pub exclude: Option<String>,
    /// SQL sort expression and direction. Creation order when `None`.
    pub order: Option<(&'static str, SortDirection)>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl Storage {
    /// Insert a destination with a fresh UUID and link its categories.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is written then.
    pub fn create_destination(&self, draft: &DestinationDraft) -> Result<Destination> {
        let id = Uuid::new_v4().to_string();
        let ts = now();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO destinations (
                id, pic_id, name, thumb_image, imagekit_file_id, content, facility,
                lat, lon, address, operating_hours, published, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            ",
            params![
                id,
                draft.pic_id,
                draft.name,
                draft.thumb_image,
                draft.imagekit_file_id,
                draft.content,
                draft.facility,
                draft.lat,
                draft.lon,
                draft.address,
                draft.operating_hours,
                draft.published,
                ts,
            ],
        )?;
        sync_categories(&tx, &id, &draft.categories)?;
        tx.commit()?;

        info!("Created destination {} ({})", id, draft.name);
        self.get_destination(&id)?
            .ok_or_else(|| Error::internal("destination vanished after insert"))
    }

    /// Get a destination by id, published or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_destination(&self, id: &str) -> Result<Option<Destination>> {
        let found = self
            .conn
            .query_row(
                &format!("{DESTINATION_SELECT} FROM {DESTINATION_FROM} WHERE d.id = ?1"),
                [id],
                Self::row_to_destination,
            )
            .optional()?;

        match found {
            Some(destination) => Ok(self.attach_categories(vec![destination])?.pop()),
            None => Ok(None),
        }
    }

    /// Update a destination and replace its category links.
    ///
    /// The stored image and its CDN file id only change when the draft
    /// carries a new image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the destination does not exist, or a
    /// database error.
    pub fn update_destination(&self, id: &str, draft: &DestinationDraft) -> Result<Destination> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            r"
            UPDATE destinations SET
                pic_id = ?1, name = ?2, content = ?3, facility = ?4, lat = ?5, lon = ?6,
                address = ?7, operating_hours = ?8, published = ?9,
                thumb_image = COALESCE(?10, thumb_image),
                imagekit_file_id = CASE WHEN ?10 IS NULL THEN imagekit_file_id ELSE ?11 END,
                updated_at = ?12
            WHERE id = ?13
            ",
            params![
                draft.pic_id,
                draft.name,
                draft.content,
                draft.facility,
                draft.lat,
                draft.lon,
                draft.address,
                draft.operating_hours,
                draft.published,
                draft.thumb_image,
                draft.imagekit_file_id,
                now(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("destination", id));
        }
        sync_categories(&tx, id, &draft.categories)?;
        tx.commit()?;

        info!("Updated destination {}", id);
        self.get_destination(id)?
            .ok_or_else(|| Error::not_found("destination", id))
    }

    /// Delete a destination with its testimonials and category links.
    ///
    /// Children go first, then the row, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is deleted then.
    pub fn delete_destination(&self, id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let testimonials = tx.execute("DELETE FROM testimonials WHERE destination_id = ?1", [id])?;
        let links = tx.execute(
            "DELETE FROM destination_category WHERE destination_id = ?1",
            [id],
        )?;
        let deleted = tx.execute("DELETE FROM destinations WHERE id = ?1", [id])?;
        tx.commit()?;

        if deleted > 0 {
            info!(
                "Deleted destination {} with {} testimonials and {} category links",
                id, testimonials, links
            );
        }
        Ok(deleted > 0)
    }

    /// One page of destinations. `scope` limits the list to one PIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_destinations(
        &self,
        query: &ListQuery,
        scope: Option<i64>,
    ) -> Result<Listing<Destination>> {
        let resolved = DESTINATION_LIST.resolve(query);
        let (conditions, params) = match scope {
            Some(pic_id) => (vec!["d.pic_id = ?".to_string()], vec![Value::Integer(pic_id)]),
            None => (Vec::new(), Vec::new()),
        };

        let mut page = self.paginate(
            DESTINATION_SELECT,
            DESTINATION_FROM,
            conditions,
            params,
            &resolved,
            Self::row_to_destination,
        )?;
        page.data = self.attach_categories(std::mem::take(&mut page.data))?;

        Ok(Listing {
            page,
            filters: resolved.filters(),
        })
    }

    /// Id and name of every destination, by name. `scope` limits the list to
    /// one PIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn destination_options(&self, scope: Option<i64>) -> Result<Vec<DestinationOption>> {
        let (sql, params) = match scope {
            Some(pic_id) => (
                "SELECT id, name, pic_id FROM destinations WHERE pic_id = ?1 ORDER BY name ASC",
                vec![Value::Integer(pic_id)],
            ),
            None => (
                "SELECT id, name, pic_id FROM destinations ORDER BY name ASC",
                Vec::new(),
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let options = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(DestinationOption {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    pic_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(options)
    }

    /// Published destinations matching a catalog filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn published_destinations(&self, filter: &CatalogFilter) -> Result<Vec<Destination>> {
        let mut conditions = vec!["d.published = 1".to_string()];
        let mut params: Vec<Value> = Vec::new();

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(term));
            let columns = ["d.name", "d.content", "d.facility", "d.address"];
            conditions.push(format!(
                "({})",
                columns
                    .iter()
                    .map(|c| format!("{c} LIKE ? ESCAPE '\\'"))
                    .collect::<Vec<_>>()
                    .join(" OR ")
            ));
            params.extend(columns.iter().map(|_| Value::Text(pattern.clone())));
        }
        if let Some(category) = filter.category {
            conditions.push(
                "EXISTS (SELECT 1 FROM destination_category dc WHERE dc.destination_id = d.id AND dc.category_id = ?)"
                    .to_string(),
            );
            params.push(Value::Integer(category));
        }
        if !filter.any_category.is_empty() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM destination_category dc WHERE dc.destination_id = d.id AND dc.category_id IN ({}))",
                placeholders(filter.any_category.len())
            ));
            params.extend(filter.any_category.iter().map(|id| Value::Integer(*id)));
        }
        if let Some(min) = filter.min_rating {
            conditions.push("COALESCE(r.avg_rating, 0) >= ?".to_string());
            params.push(Value::Real(min));
        }
        if let Some(exclude) = &filter.exclude {
            conditions.push("d.id != ?".to_string());
            params.push(Value::Text(exclude.clone()));
        }

        let order = match filter.order {
            Some((expr, dir)) => format!("{expr} {}, d.rowid ASC", dir.as_sql()),
            None => NATURAL_ORDER.to_string(),
        };
        let mut sql = format!(
            "{DESTINATION_SELECT} FROM {DESTINATION_FROM} WHERE {} ORDER BY {order}",
            conditions.join(" AND ")
        );
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        debug!("Catalog query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let destinations = stmt
            .query_map(params_from_iter(params.iter()), Self::row_to_destination)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.attach_categories(destinations)
    }

    /// Up to `limit` published destinations sharing a category with
    /// `destination`, excluding itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn related_destinations(
        &self,
        destination: &Destination,
        limit: usize,
    ) -> Result<Vec<Destination>> {
        let category_ids = destination.category_ids();
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.published_destinations(&CatalogFilter {
            any_category: category_ids,
            exclude: Some(destination.id.clone()),
            limit: Some(limit),
            ..CatalogFilter::default()
        })
    }

    /// Whether a destination with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn destination_exists(&self, id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM destinations WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn attach_categories(&self, mut destinations: Vec<Destination>) -> Result<Vec<Destination>> {
        let ids: Vec<String> = destinations.iter().map(|d| d.id.clone()).collect();
        let mut by_destination = self.categories_for_destinations(&ids)?;
        for destination in &mut destinations {
            destination.categories = by_destination.remove(&destination.id).unwrap_or_default();
        }
        Ok(destinations)
    }

    fn row_to_destination(row: &Row<'_>) -> rusqlite::Result<Destination> {
        let pic_id: i64 = row.get(1)?;
        let pic_name: Option<String> = row.get(16)?;
        let pic_email: Option<String> = row.get(17)?;
        let pic = match (pic_name, pic_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: pic_id,
                name,
                email,
            }),
            _ => None,
        };

        Ok(Destination {
            id: row.get(0)?,
            pic_id,
            name: row.get(2)?,
            thumb_image: row.get(3)?,
            imagekit_file_id: row.get(4)?,
            content: row.get(5)?,
            facility: row.get(6)?,
            lat: row.get(7)?,
            lon: row.get(8)?,
            address: row.get(9)?,
            operating_hours: row.get(10)?,
            published: row.get(11)?,
            created_at: parse_timestamp(row, 12)?,
            updated_at: parse_timestamp(row, 13)?,
            avg_rating: row.get(14)?,
            total_reviews: row.get(15)?,
            categories: Vec::new(),
            pic,
            distance: None,
            image_url: None,
        })
    }
}

/// Make the destination's links match `categories` exactly.
fn sync_categories(tx: &Transaction<'_>, destination_id: &str, categories: &[i64]) -> Result<()> {
    if categories.is_empty() {
        tx.execute(
            "DELETE FROM destination_category WHERE destination_id = ?1",
            [destination_id],
        )?;
        return Ok(());
    }

    let mut params = vec![Value::Text(destination_id.to_string())];
    params.extend(categories.iter().map(|id| Value::Integer(*id)));
    tx.execute(
        &format!(
            "DELETE FROM destination_category WHERE destination_id = ? AND category_id NOT IN ({})",
            placeholders(categories.len())
        ),
        params_from_iter(params.iter()),
    )?;

    for category_id in categories {
        tx.execute(
            "INSERT OR IGNORE INTO destination_category (destination_id, category_id) VALUES (?1, ?2)",
            params![destination_id, category_id],
        )?;
    }
    Ok(())
}
