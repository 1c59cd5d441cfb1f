//! Tourism destinations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::user::UserSummary;
use crate::geo::{Coordinates, Located};

/// A destination with its derived fields.
///
/// `avg_rating` and `total_reviews` are computed from testimonials on every
/// read and are never stored. `distance` is only set when the caller ranked
/// the record against a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// UUID v4.
    pub id: String,
    /// The PIC (owning user).
    pub pic_id: i64,
    /// Display name.
    pub name: String,
    /// Original image URL.
    pub thumb_image: Option<String>,
    /// ImageKit file id of the image, when it was uploaded there.
    pub imagekit_file_id: Option<String>,
    /// Descriptive text.
    pub content: String,
    /// Facility list.
    pub facility: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Street address.
    pub address: Option<String>,
    /// Opening hours, free text.
    pub operating_hours: Option<String>,
    /// Visible in the public catalog.
    pub published: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Mean testimonial rating rounded to one decimal, 0 without reviews.
    pub avg_rating: f64,
    /// Number of testimonials.
    pub total_reviews: i64,
    /// Linked categories.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// The PIC, when loaded alongside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic: Option<UserSummary>,
    /// Kilometres from the caller, rounded to one decimal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// CDN-optimized image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Destination {
    /// The destination's position.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// Ids of the linked categories.
    #[must_use]
    pub fn category_ids(&self) -> Vec<i64> {
        self.categories.iter().map(|c| c.id).collect()
    }
}

impl Located for Destination {
    fn coordinates(&self) -> Coordinates {
        Destination::coordinates(self)
    }

    fn set_distance(&mut self, km: f64) {
        self.distance = Some(km);
    }
}

/// Minimal destination reference used in dropdowns and testimonial rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationOption {
    /// UUID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The PIC.
    pub pic_id: i64,
}

/// Validated destination payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationDraft {
    /// The PIC.
    pub pic_id: i64,
    /// Display name.
    pub name: String,
    /// New image URL. `None` on update keeps the current one.
    pub thumb_image: Option<String>,
    /// ImageKit file id of the new image.
    pub imagekit_file_id: Option<String>,
    /// Descriptive text.
    pub content: String,
    /// Facility list.
    pub facility: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Street address.
    pub address: Option<String>,
    /// Opening hours.
    pub operating_hours: Option<String>,
    /// Visible in the public catalog.
    pub published: bool,
    /// Category ids to link, replacing existing links.
    pub categories: Vec<i64>,
}
