//! Dataset import.
//!
//! Reads a JSON array of scraped destination records and loads them as
//! published destinations owned by one PIC. Each record may carry a single
//! review, imported as a testimonial.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{CategoryDraft, DestinationDraft, TestimonialDraft};
use crate::storage::Storage;

/// Category keywords, checked against the lowercased name in this order.
pub const CATEGORY_KEYWORDS: &[&str] = &[
    "bukit", "gunung", "sungai", "danau", "hutan", "waduk", "rawa", "pulau",
];

/// Longest imported text before it is cut with an ellipsis.
const TEXT_LIMIT: usize = 250;

/// Name shown on imported reviews, which carry no author.
const REVIEWER_NAME: &str = "Pengunjung";

/// One dataset record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedRecord {
    /// Destination name.
    #[serde(rename = "Nama")]
    pub name: Option<String>,
    /// Image URL.
    #[serde(rename = "Image_URL")]
    pub image_url: Option<String>,
    /// Latitude, as a number or a string with a decimal comma.
    #[serde(rename = "Latitude")]
    pub latitude: Value,
    /// Longitude, as a number or a string with a decimal comma.
    #[serde(rename = "Longitude")]
    pub longitude: Value,
    /// Address.
    #[serde(rename = "Tempat")]
    pub place: Option<String>,
    /// Review text.
    #[serde(rename = "Review")]
    pub review: Option<String>,
    /// Review rating.
    #[serde(rename = "Rating")]
    pub rating: Value,
}

/// Import counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Destinations created.
    pub destinations: usize,
    /// Testimonials created.
    pub testimonials: usize,
    /// Categories created on demand.
    pub categories_created: usize,
    /// Records skipped for lack of a name.
    pub skipped: usize,
}

/// Parse a number that may use a decimal comma. Blank or unparseable values
/// are `None`.
#[must_use]
pub fn parse_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    };
    parsed.filter(|v: &f64| v.is_finite())
}

/// The category keyword a destination name falls under, if any.
#[must_use]
pub fn category_keyword(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lower.contains(keyword))
}

/// Round a review rating into 1..=5. A missing rating counts as 5.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn review_rating(value: &Value) -> u8 {
    parse_decimal(value).map_or(5.0, f64::round).clamp(1.0, 5.0) as u8
}

fn limit_text(text: &str) -> String {
    if text.chars().count() <= TEXT_LIMIT {
        text.to_string()
    } else {
        let cut: String = text.chars().take(TEXT_LIMIT).collect();
        format!("{}...", cut.trim_end())
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Seeds one storage with records on behalf of one PIC.
#[derive(Debug)]
pub struct Seeder<'a> {
    storage: &'a Storage,
    pic_id: i64,
}

impl<'a> Seeder<'a> {
    /// Create a seeder. The PIC must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the PIC does not exist.
    pub fn new(storage: &'a Storage, pic_id: i64) -> Result<Self> {
        if !storage.user_exists(pic_id)? {
            return Err(Error::not_found("user", pic_id));
        }
        Ok(Self { storage, pic_id })
    }

    /// Import a JSON dataset file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a storage
    /// error.
    pub fn import_file(&self, path: &Path) -> Result<SeedReport> {
        let json = std::fs::read_to_string(path)?;
        let records: Vec<SeedRecord> = serde_json::from_str(&json)?;
        info!("Importing {} records from {}", records.len(), path.display());
        self.import(&records)
    }

    /// Import parsed records.
    ///
    /// # Errors
    ///
    /// Returns a storage error. Records before the failure stay imported.
    pub fn import(&self, records: &[SeedRecord]) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        for record in records {
            let Some(name) = record
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
            else {
                warn!("Skipping record without a name");
                report.skipped += 1;
                continue;
            };

            let categories = match category_keyword(name) {
                Some(keyword) => vec![self.category_for(keyword, &mut report)?],
                None => Vec::new(),
            };

            let draft = DestinationDraft {
                pic_id: self.pic_id,
                name: limit_text(name),
                thumb_image: record
                    .image_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(limit_text),
                imagekit_file_id: None,
                content: String::new(),
                facility: String::new(),
                lat: parse_decimal(&record.latitude).unwrap_or(0.0),
                lon: parse_decimal(&record.longitude).unwrap_or(0.0),
                address: record.place.as_deref().map(limit_text),
                operating_hours: None,
                published: true,
                categories,
            };
            let destination = self.storage.create_destination(&draft)?;
            report.destinations += 1;

            if let Some(review) = record
                .review
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
            {
                self.storage.create_testimonial(&TestimonialDraft {
                    destination_id: destination.id.clone(),
                    name: REVIEWER_NAME.to_string(),
                    comment: limit_text(review),
                    rating: review_rating(&record.rating),
                })?;
                report.testimonials += 1;
            }
            debug!("Seeded destination {}", destination.name);
        }

        info!(
            "Seeded {} destinations, {} testimonials, {} new categories ({} skipped)",
            report.destinations, report.testimonials, report.categories_created, report.skipped
        );
        Ok(report)
    }

    fn category_for(&self, keyword: &str, report: &mut SeedReport) -> Result<i64> {
        let name = title_case(keyword);
        if let Some(existing) = self.storage.category_by_name(&name)? {
            return Ok(existing.id);
        }
        let created = self
            .storage
            .create_category(&CategoryDraft { name, img: None })?;
        report.categories_created += 1;
        Ok(created.id)
    }
}
