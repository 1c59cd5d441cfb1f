//! Destination categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A category such as "pantai" or "gunung".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Row id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Optional image URL.
    pub img: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Validated category payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    /// Display name.
    pub name: String,
    /// Optional image URL. `None` on update keeps the current image.
    pub img: Option<String>,
}
