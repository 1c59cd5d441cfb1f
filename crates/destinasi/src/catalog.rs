//! Public catalog: home page, browsable listing and destination detail.
//!
//! Only published destinations appear here. When the visitor shares a
//! location, results are ranked by distance; the listing then paginates by
//! accumulation, so page `n` returns the first `n * per_page` results
//! ("load more") rather than a single slice.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::geo::{rank_by_proximity, Coordinates};
use crate::listing::SortDirection;
use crate::media::{attach_image_urls, ImageService};
use crate::models::{Category, Destination, Testimonial};
use crate::policy::Actor;
use crate::storage::{CatalogFilter, Storage};

/// Sort fields accepted by the catalog, as `(query name, SQL expression)`.
pub const CATALOG_SORTABLE: &[(&str, &str)] = &[
    ("name", "d.name"),
    ("created_at", "d.created_at"),
    ("avg_rating", "COALESCE(r.avg_rating, 0)"),
    ("total_reviews", "COALESCE(r.total_reviews, 0)"),
];

/// Deserialize a query-string value, treating blank or unparseable input as
/// absent. HTML forms send empty strings for untouched fields.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

/// Catalog query-string parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    /// Substring over name, content, facility and address.
    pub search: Option<String>,
    /// Category id.
    #[serde(deserialize_with = "lenient")]
    pub category: Option<i64>,
    /// Minimum average rating.
    #[serde(deserialize_with = "lenient")]
    pub min_rating: Option<f64>,
    /// Accumulated page number, from 1.
    #[serde(deserialize_with = "lenient")]
    pub page: Option<i64>,
    /// Results per page.
    #[serde(deserialize_with = "lenient", alias = "perPage")]
    pub per_page: Option<i64>,
    /// Sort field, used only without a location.
    #[serde(alias = "sortField")]
    pub sort_field: Option<String>,
    /// Sort direction.
    #[serde(alias = "sortDirection")]
    pub sort_direction: Option<String>,
    /// Visitor latitude.
    #[serde(deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    /// Visitor longitude.
    #[serde(deserialize_with = "lenient")]
    pub longitude: Option<f64>,
}

impl CatalogQuery {
    /// The visitor's position, when both halves were sent.
    #[must_use]
    pub fn origin(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

/// Applied catalog filters, echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilters {
    /// Applied search term.
    pub search: Option<String>,
    /// Applied category.
    pub category: Option<i64>,
    /// Applied minimum rating.
    pub min_rating: Option<f64>,
    /// Applied sort field; `distance` when ranked by location.
    pub sort_field: Option<String>,
    /// Applied direction.
    pub sort_direction: Option<SortDirection>,
    /// Applied visitor position.
    pub origin: Option<Coordinates>,
}

/// One accumulated catalog page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// The first `page * per_page` matching destinations.
    pub data: Vec<Destination>,
    /// Requested page.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
    /// All matches.
    pub total: u64,
    /// Whether another page would add results.
    pub has_more: bool,
    /// Applied filters.
    pub filters: CatalogFilters,
    /// Every category, for the filter dropdown.
    pub categories: Vec<Category>,
}

/// Home page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomePage {
    /// Closest destinations, or the first ones without a location.
    pub nearby_destinations: Vec<Destination>,
    /// Featured categories.
    pub categories: Vec<Category>,
    /// All testimonials.
    pub testimonials: Vec<Testimonial>,
}

/// Destination detail page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationDetail {
    /// The destination with its categories.
    pub destination: Destination,
    /// Its testimonials, newest first.
    pub testimonials: Vec<Testimonial>,
    /// Other destinations near the visitor, or near this one.
    pub nearby_destinations: Vec<Destination>,
    /// Other destinations sharing a category.
    pub related_destinations: Vec<Destination>,
}

/// Public catalog queries over one storage handle.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    storage: &'a Storage,
    images: Option<&'a dyn ImageService>,
    config: &'a CatalogConfig,
}

impl<'a> Catalog<'a> {
    /// Create a catalog view.
    #[must_use]
    pub fn new(
        storage: &'a Storage,
        images: Option<&'a dyn ImageService>,
        config: &'a CatalogConfig,
    ) -> Self {
        Self {
            storage,
            images,
            config,
        }
    }

    /// Home page: nearby destinations, featured categories, testimonials.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query fails.
    pub fn home(&self, origin: Option<Coordinates>) -> Result<HomePage> {
        let nearby_destinations = self.nearby(origin, None, self.config.home_nearby_limit)?;
        let categories = self
            .storage
            .categories_limit(self.config.home_category_limit)?;
        let testimonials = self.storage.all_testimonials()?;

        Ok(HomePage {
            nearby_destinations,
            categories,
            testimonials,
        })
    }

    /// Filtered, ranked, accumulated listing.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query fails.
    pub fn browse(&self, query: &CatalogQuery) -> Result<CatalogPage> {
        let origin = query.origin();
        let per_page = query.per_page.map_or(self.config.default_per_page, |n| {
            u32::try_from(n.clamp(1, i64::from(self.config.max_per_page)))
                .unwrap_or(self.config.default_per_page)
        });
        let page = query
            .page
            .map_or(1, |n| u32::try_from(n.max(1)).unwrap_or(u32::MAX));

        // A location overrides any requested sort.
        let order = if origin.is_some() {
            None
        } else {
            query.sort_field.as_deref().and_then(|field| {
                CATALOG_SORTABLE
                    .iter()
                    .find(|(name, _)| *name == field)
                    .map(|(name, sql)| {
                        let dir = SortDirection::parse(
                            query.sort_direction.as_deref(),
                            SortDirection::Asc,
                        );
                        (*name, *sql, dir)
                    })
            })
        };

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        let filter = CatalogFilter {
            search: search.clone(),
            category: query.category,
            min_rating: query.min_rating,
            order: order.map(|(_, sql, dir)| (sql, dir)),
            ..CatalogFilter::default()
        };

        let matches = self.storage.published_destinations(&filter)?;
        let ranked = rank_by_proximity(origin, matches);
        let total = ranked.len();
        let shown = usize::try_from(u64::from(page) * u64::from(per_page))
            .unwrap_or(usize::MAX)
            .min(total);
        let mut data: Vec<Destination> = ranked.into_iter().take(shown).collect();
        attach_image_urls(self.images, &mut data);
        debug!(
            "Catalog page {} shows {} of {} destinations",
            page, shown, total
        );

        let (sort_field, sort_direction) = match (origin, order) {
            (Some(_), _) => (Some("distance".to_string()), Some(SortDirection::Asc)),
            (None, Some((name, _, dir))) => (Some(name.to_string()), Some(dir)),
            (None, None) => (None, None),
        };

        Ok(CatalogPage {
            data,
            page,
            per_page,
            total: total as u64,
            has_more: shown < total,
            filters: CatalogFilters {
                search,
                category: query.category,
                min_rating: query.min_rating,
                sort_field,
                sort_direction,
                origin,
            },
            categories: self.storage.all_categories()?,
        })
    }

    /// One published destination with its testimonials, nearby and related
    /// destinations. An unpublished destination is visible only to a
    /// `viewer` who manages it, as a preview.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing destination or one the
    /// viewer may not preview, or a storage error.
    pub fn detail(
        &self,
        id: &str,
        origin: Option<Coordinates>,
        viewer: Option<Actor>,
    ) -> Result<DestinationDetail> {
        let mut destination = self
            .storage
            .get_destination(id)?
            .filter(|d| d.published || viewer.is_some_and(|v| v.manages(d.pic_id)))
            .ok_or_else(|| Error::not_found("destination", id))?;
        attach_image_urls(self.images, std::slice::from_mut(&mut destination));

        let testimonials = self.storage.testimonials_for_destination(id)?;
        let nearby_destinations = self.nearby(
            origin.or_else(|| Some(destination.coordinates())),
            Some(id),
            self.config.nearby_limit,
        )?;
        let mut related_destinations = self
            .storage
            .related_destinations(&destination, self.config.related_limit)?;
        attach_image_urls(self.images, &mut related_destinations);

        Ok(DestinationDetail {
            destination,
            testimonials,
            nearby_destinations,
            related_destinations,
        })
    }

    fn nearby(
        &self,
        origin: Option<Coordinates>,
        exclude: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Destination>> {
        let filter = CatalogFilter {
            exclude: exclude.map(ToString::to_string),
            // Without an origin the first rows in creation order are enough.
            limit: origin.is_none().then_some(limit),
            ..CatalogFilter::default()
        };
        let candidates = self.storage.published_destinations(&filter)?;
        let mut nearby: Vec<Destination> = rank_by_proximity(origin, candidates)
            .into_iter()
            .take(limit)
            .collect();
        attach_image_urls(self.images, &mut nearby);
        Ok(nearby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::FakeImages;
    use crate::models::Role;
    use crate::storage::test_support::*;

    fn config() -> CatalogConfig {
        CatalogConfig {
            default_per_page: 2,
            ..CatalogConfig::default()
        }
    }

    fn seeded() -> (Storage, Vec<String>) {
        let storage = create_test_storage();
        let pic = add_user(&storage, "pic@example.com", Role::Admin);
        let mut ids = Vec::new();
        for (name, lon) in [("Far", 112.0), ("Near", 109.1), ("Mid", 110.0)] {
            let mut draft = destination_draft(pic, name, Vec::new());
            draft.lon = lon;
            ids.push(storage.create_destination(&draft).unwrap().id);
        }
        (storage, ids)
    }

    #[test]
    fn test_browse_without_location_uses_creation_order() {
        let (storage, _) = seeded();
        let config = config();
        let catalog = Catalog::new(&storage, None, &config);

        let page = catalog.browse(&CatalogQuery::default()).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.data.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.data[0].name, "Far");
        assert!(page.data[0].distance.is_none());
    }

    #[test]
    fn test_browse_accumulates_pages() {
        let (storage, _) = seeded();
        let config = config();
        let catalog = Catalog::new(&storage, None, &config);

        let page = catalog
            .browse(&CatalogQuery {
                page: Some(2),
                ..CatalogQuery::default()
            })
            .unwrap();
        assert_eq!(page.data.len(), 3);
        assert!(!page.has_more);
    }

    #[test]
    fn test_browse_with_location_ranks_by_distance() {
        let (storage, _) = seeded();
        let config = config();
        let catalog = Catalog::new(&storage, None, &config);

        let page = catalog
            .browse(&CatalogQuery {
                latitude: Some(0.0),
                longitude: Some(109.0),
                sort_field: Some("name".to_string()),
                ..CatalogQuery::default()
            })
            .unwrap();
        let names: Vec<_> = page.data.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Near", "Mid"]);
        assert_eq!(page.data[0].distance, Some(11.1));
        assert_eq!(page.filters.sort_field.as_deref(), Some("distance"));
    }

    #[test]
    fn test_browse_sort_field_and_unknown_field() {
        let (storage, _) = seeded();
        let config = config();
        let catalog = Catalog::new(&storage, None, &config);

        let page = catalog
            .browse(&CatalogQuery {
                sort_field: Some("name".to_string()),
                per_page: Some(10),
                ..CatalogQuery::default()
            })
            .unwrap();
        assert_eq!(page.data[0].name, "Far");
        assert_eq!(page.data[1].name, "Mid");

        let page = catalog
            .browse(&CatalogQuery {
                sort_field: Some("pic_id".to_string()),
                ..CatalogQuery::default()
            })
            .unwrap();
        assert!(page.filters.sort_field.is_none());
        assert_eq!(page.data[0].name, "Far");
    }

    #[test]
    fn test_browse_search_without_matches() {
        let (storage, _) = seeded();
        let config = config();
        let catalog = Catalog::new(&storage, None, &config);
        let page = catalog
            .browse(&CatalogQuery {
                search: Some("tidak ada".to_string()),
                ..CatalogQuery::default()
            })
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.data.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_browse_attaches_image_urls() {
        let (storage, _) = seeded();
        let config = config();
        let images = FakeImages::default();
        let catalog = Catalog::new(&storage, Some(&images), &config);
        let page = catalog.browse(&CatalogQuery::default()).unwrap();
        let url = page.data[0].image_url.as_deref().unwrap();
        assert!(url.contains("tr:w-800,h-600,q-100,c-maintain_ratio"));
    }

    #[test]
    fn test_home_limits() {
        let (storage, _) = seeded();
        for name in ["A", "B", "C", "D", "E"] {
            add_category(&storage, name);
        }
        let config = CatalogConfig {
            home_nearby_limit: 2,
            ..CatalogConfig::default()
        };
        let catalog = Catalog::new(&storage, None, &config);
        let home = catalog.home(Some(Coordinates::new(0.0, 112.0))).unwrap();
        assert_eq!(home.nearby_destinations.len(), 2);
        assert_eq!(home.nearby_destinations[0].name, "Far");
        assert_eq!(home.categories.len(), 4);
    }

    #[test]
    fn test_detail_includes_related_and_excludes_self() {
        let storage = create_test_storage();
        let pic = add_user(&storage, "pic@example.com", Role::Admin);
        let cat = add_category(&storage, "Danau");
        let main = add_destination(&storage, pic, "Danau A", vec![cat]);
        add_destination(&storage, pic, "Danau B", vec![cat]);
        add_destination(&storage, pic, "Gunung C", Vec::new());
        add_testimonial(&storage, &main, 5);

        let config = CatalogConfig::default();
        let catalog = Catalog::new(&storage, None, &config);
        let detail = catalog.detail(&main, None, None).unwrap();
        assert_eq!(detail.testimonials.len(), 1);
        assert_eq!(detail.related_destinations.len(), 1);
        assert_eq!(detail.related_destinations[0].name, "Danau B");
        assert_eq!(detail.nearby_destinations.len(), 2);
        assert!(detail.nearby_destinations.iter().all(|d| d.id != main));
    }

    #[test]
    fn test_detail_hides_unpublished_and_missing() {
        let storage = create_test_storage();
        let pic = add_user(&storage, "pic@example.com", Role::Admin);
        let mut draft = destination_draft(pic, "Draft", Vec::new());
        draft.published = false;
        let hidden = storage.create_destination(&draft).unwrap().id;

        let config = CatalogConfig::default();
        let catalog = Catalog::new(&storage, None, &config);
        assert!(catalog.detail(&hidden, None, None).unwrap_err().is_not_found());
        assert!(catalog
            .detail("missing", None, None)
            .unwrap_err()
            .is_not_found());

        let other = Actor::new(pic + 1, Role::Admin);
        assert!(catalog
            .detail(&hidden, None, Some(other))
            .unwrap_err()
            .is_not_found());
        let owner = Actor::new(pic, Role::Admin);
        assert_eq!(
            catalog
                .detail(&hidden, None, Some(owner))
                .unwrap()
                .destination
                .name,
            "Draft"
        );
    }

    #[test]
    fn test_query_lenient_parsing() {
        let query: CatalogQuery = serde_json::from_value(serde_json::json!({
            "category": "",
            "min_rating": "4.5",
            "latitude": "-0.03",
            "longitude": "abc",
            "perPage": "12"
        }))
        .unwrap();
        assert_eq!(query.category, None);
        assert_eq!(query.min_rating, Some(4.5));
        assert_eq!(query.per_page, Some(12));
        assert!(query.origin().is_none());
    }
}
