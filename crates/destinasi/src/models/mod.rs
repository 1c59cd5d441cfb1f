//! Core record types for destinasi.
//!
//! Read models (`Destination`, `Testimonial`, ...) are what storage returns
//! and what the HTTP layer serializes. Drafts (`DestinationDraft`, ...) are
//! validated write payloads.

pub mod category;
pub mod destination;
pub mod testimonial;
pub mod user;

pub use category::{Category, CategoryDraft};
pub use destination::{Destination, DestinationDraft, DestinationOption};
pub use testimonial::{Testimonial, TestimonialDraft};
pub use user::{Role, User, UserDraft, UserSummary};
