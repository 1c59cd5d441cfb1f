//! Category queries.

use std::collections::HashMap;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::info;

use super::{now, parse_timestamp, placeholders, Storage};
use crate::error::{Error, Result};
use crate::listing::{ListQuery, ListSpec, Listing, SortDirection};
use crate::models::{Category, CategoryDraft};

const CATEGORY_COLUMNS: &str = "SELECT id, name, img, created_at, updated_at";

/// Searchable and sortable columns for the category list.
pub const CATEGORY_LIST: ListSpec = ListSpec {
    searchable: &["name"],
    sortable: &[
        ("id", "id"),
        ("name", "name"),
        ("created_at", "created_at"),
        ("updated_at", "updated_at"),
    ],
    default_sort: "id",
    default_direction: SortDirection::Desc,
    tiebreak: "id",
};

impl Storage {
    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
        let ts = now();
        self.conn.execute(
            "INSERT INTO categories (name, img, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![draft.name, draft.img, ts],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("Created category {} ({})", id, draft.name);
        self.get_category(id)?
            .ok_or_else(|| Error::internal("category vanished after insert"))
    }

    /// Get a category by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!("{CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
                [id],
                Self::row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Find a category by exact name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!(
                    "{CATEGORY_COLUMNS} FROM categories WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1"
                ),
                [name],
                Self::row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Update a category. A draft without an image keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the category does not exist, or a
    /// database error.
    pub fn update_category(&self, id: i64, draft: &CategoryDraft) -> Result<Category> {
        let changed = self.conn.execute(
            "UPDATE categories SET name = ?1, img = COALESCE(?2, img), updated_at = ?3 WHERE id = ?4",
            params![draft.name, draft.img, now(), id],
        )?;
        if changed == 0 {
            return Err(Error::not_found("category", id));
        }
        info!("Updated category {}", id);
        self.get_category(id)?
            .ok_or_else(|| Error::not_found("category", id))
    }

    /// Delete a category, detaching it from every destination first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_category(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let detached = tx.execute(
            "DELETE FROM destination_category WHERE category_id = ?1",
            [id],
        )?;
        let deleted = tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
        tx.commit()?;

        if deleted > 0 {
            info!(
                "Deleted category {} (detached from {} destinations)",
                id, detached
            );
        }
        Ok(deleted > 0)
    }

    /// One page of categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_categories(&self, query: &ListQuery) -> Result<Listing<Category>> {
        let resolved = CATEGORY_LIST.resolve(query);
        let page = self.paginate(
            CATEGORY_COLUMNS,
            "categories",
            Vec::new(),
            Vec::<Value>::new(),
            &resolved,
            Self::row_to_category,
        )?;
        Ok(Listing {
            page,
            filters: resolved.filters(),
        })
    }

    /// Every category, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_COLUMNS} FROM categories ORDER BY name ASC, id ASC"
        ))?;
        let categories = stmt
            .query_map([], Self::row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// The first `limit` categories in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn categories_limit(&self, limit: usize) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_COLUMNS} FROM categories ORDER BY id ASC LIMIT ?1"
        ))?;
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let categories = stmt
            .query_map([limit_i64], Self::row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Whether every id names an existing category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn categories_exist(&self, ids: &[i64]) -> Result<bool> {
        Ok(self.missing_categories(ids)?.is_empty())
    }

    /// The ids in `ids` that name no category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn missing_categories(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id FROM categories WHERE id IN ({})",
            placeholders(ids.len())
        ))?;
        let found = stmt
            .query_map(params_from_iter(ids.iter()), |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect())
    }

    /// Categories linked to each of the given destinations.
    pub(crate) fn categories_for_destinations(
        &self,
        destination_ids: &[String],
    ) -> Result<HashMap<String, Vec<Category>>> {
        let mut by_destination: HashMap<String, Vec<Category>> = HashMap::new();
        if destination_ids.is_empty() {
            return Ok(by_destination);
        }

        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT dc.destination_id, c.id, c.name, c.img, c.created_at, c.updated_at
            FROM destination_category dc
            JOIN categories c ON c.id = dc.category_id
            WHERE dc.destination_id IN ({})
            ORDER BY dc.id ASC
            ",
            placeholders(destination_ids.len())
        ))?;
        let rows = stmt
            .query_map(params_from_iter(destination_ids.iter()), |row| {
                let destination_id: String = row.get(0)?;
                Ok((
                    destination_id,
                    Category {
                        id: row.get(1)?,
                        name: row.get(2)?,
                        img: row.get(3)?,
                        created_at: parse_timestamp(row, 4)?,
                        updated_at: parse_timestamp(row, 5)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (destination_id, category) in rows {
            by_destination
                .entry(destination_id)
                .or_default()
                .push(category);
        }
        Ok(by_destination)
    }

    fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            img: row.get(2)?,
            created_at: parse_timestamp(row, 3)?,
            updated_at: parse_timestamp(row, 4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::listing::ListQuery;
    use crate::models::{CategoryDraft, Role};

    #[test]
    fn test_create_get_update_category() {
        let storage = create_test_storage();
        let created = storage
            .create_category(&CategoryDraft {
                name: "Pantai".to_string(),
                img: Some("/img/pantai.jpg".to_string()),
            })
            .unwrap();

        let updated = storage
            .update_category(
                created.id,
                &CategoryDraft {
                    name: "Pantai & Laut".to_string(),
                    img: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Pantai & Laut");
        assert_eq!(updated.img.as_deref(), Some("/img/pantai.jpg"));
    }

    #[test]
    fn test_update_missing_category() {
        let storage = create_test_storage();
        let err = storage
            .update_category(
                7,
                &CategoryDraft {
                    name: "x".to_string(),
                    img: None,
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_categories() {
        let storage = create_test_storage();
        let a = add_category(&storage, "Gunung");
        let b = add_category(&storage, "Danau");
        assert!(storage.missing_categories(&[a, b]).unwrap().is_empty());
        assert_eq!(storage.missing_categories(&[a, 99]).unwrap(), vec![99]);
        assert!(storage.categories_exist(&[]).unwrap());
        assert!(!storage.categories_exist(&[99]).unwrap());
    }

    #[test]
    fn test_category_by_name_ignores_case() {
        let storage = create_test_storage();
        let id = add_category(&storage, "Bukit");
        assert_eq!(storage.category_by_name("bukit").unwrap().unwrap().id, id);
        assert!(storage.category_by_name("gunung").unwrap().is_none());
    }

    #[test]
    fn test_delete_category_detaches_destinations() {
        let storage = create_test_storage();
        let pic = add_user(&storage, "pic@example.com", Role::Admin);
        let cat = add_category(&storage, "Waduk");
        let dest = add_destination(&storage, pic, "Waduk Riam Kanan", vec![cat]);

        assert!(storage.delete_category(cat).unwrap());
        let destination = storage.get_destination(&dest).unwrap().unwrap();
        assert!(destination.categories.is_empty());
        assert!(!storage.delete_category(cat).unwrap());
    }

    #[test]
    fn test_categories_limit_and_all() {
        let storage = create_test_storage();
        for name in ["Sungai", "Hutan", "Rawa", "Pulau", "Danau"] {
            add_category(&storage, name);
        }
        let first = storage.categories_limit(4).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first[0].name, "Sungai");

        let all = storage.all_categories().unwrap();
        assert_eq!(all[0].name, "Danau");
    }

    #[test]
    fn test_list_categories_empty_search() {
        let storage = create_test_storage();
        add_category(&storage, "Gunung");
        let listing = storage
            .list_categories(&ListQuery {
                search: Some("tidak ada".to_string()),
                ..ListQuery::default()
            })
            .unwrap();
        assert_eq!(listing.page.total, 0);
        assert_eq!(listing.page.last_page, 1);
        assert!(listing.page.data.is_empty());
        assert!(listing.page.from.is_none());
    }
}
