//! Visitor testimonials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::destination::DestinationOption;

/// A rating and comment left on a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimonial {
    /// Row id.
    pub id: i64,
    /// The destination this testimonial belongs to.
    pub destination_id: String,
    /// Free-text author name.
    pub name: String,
    /// The comment.
    pub comment: String,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// The destination, when loaded alongside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<DestinationOption>,
}

/// Validated testimonial payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestimonialDraft {
    /// Target destination.
    pub destination_id: String,
    /// Author name.
    pub name: String,
    /// Comment text.
    pub comment: String,
    /// Rating from 1 to 5.
    pub rating: u8,
}
