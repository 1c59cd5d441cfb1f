//! Input validation for write requests.
//!
//! Each `*Input` struct is the raw JSON body of a create or update request.
//! `validate` checks it field by field, collects every failure into
//! [`ValidationErrors`], and on success returns the matching draft from
//! [`crate::models`]. Lookups that need the database (does this user exist,
//! is this email taken) go through the [`References`] trait.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use destinasi_imagekit::parse_http_url;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CategoryDraft, DestinationDraft, Role, TestimonialDraft, UserDraft};

/// Longest accepted value for short text fields.
pub const MAX_STRING: usize = 255;

/// Shortest accepted password.
pub const MIN_PASSWORD: usize = 8;

/// Longest accepted phone number.
pub const MAX_PHONE: usize = 20;

/// Whether a request creates a record or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A new record.
    Create,
    /// An existing record.
    Update,
}

/// Field-level validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// No errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Messages recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Whether any field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether a field failed.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The first message, used as the summary line.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }

    /// Return `value` if nothing failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] carrying every recorded failure.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.first_message() {
            Some(first) if self.len() > 1 => {
                write!(f, "{first} (and {} more fields)", self.len() - 1)
            }
            Some(first) => f.write_str(first),
            None => f.write_str("no errors"),
        }
    }
}

/// Database lookups needed by the validators.
pub trait References {
    /// Whether a user with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn user_exists(&self, id: i64) -> Result<bool>;

    /// Which of the given category ids do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn missing_categories(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Whether a destination with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn destination_exists(&self, id: &str) -> Result<bool>;

    /// Whether another user already uses this email.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool>;
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn required_msg(field: &str) -> String {
    format!("The {} field is required.", label(field))
}

fn max_msg(field: &str, max: usize) -> String {
    format!(
        "The {} field must not be greater than {max} characters.",
        label(field)
    )
}

fn invalid_selection_msg(field: &str) -> String {
    format!("The selected {} is invalid.", label(field))
}

/// Trimmed, non-empty text, or `None`.
fn present(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// A required text field, length-checked.
fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&String>,
    max: Option<usize>,
) -> String {
    match present(value) {
        None => {
            errors.add(field, required_msg(field));
            String::new()
        }
        Some(text) => {
            if let Some(max) = max {
                if text.chars().count() > max {
                    errors.add(field, max_msg(field, max));
                }
            }
            text.to_string()
        }
    }
}

/// An optional text field, length-checked. Blank counts as absent.
fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&String>,
    max: usize,
) -> Option<String> {
    let text = present(value)?;
    if text.chars().count() > max {
        errors.add(field, max_msg(field, max));
    }
    Some(text.to_string())
}

fn required_number(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> f64 {
    match value {
        None => {
            errors.add(field, required_msg(field));
            0.0
        }
        Some(n) if !n.is_finite() => {
            errors.add(field, format!("The {} field must be a number.", label(field)));
            0.0
        }
        Some(n) => {
            if n < min || n > max {
                errors.add(
                    field,
                    format!("The {} field must be between {min} and {max}.", label(field)),
                );
            }
            n
        }
    }
}

/// An absolute http(s) URL, or a path on the CDN.
fn is_image_reference(value: &str) -> bool {
    if value.starts_with('/') {
        return !value.starts_with("//");
    }
    parse_http_url(value).is_ok()
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email pattern"))
}

/// Whether a string looks like an email address.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value)
}

/// Raw destination payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationInput {
    /// Owning user.
    pub pic_id: Option<i64>,
    /// Display name.
    pub name: Option<String>,
    /// Image URL, usually the `url` returned by the upload endpoint.
    pub thumb_image: Option<String>,
    /// CDN file id returned by the upload endpoint.
    pub imagekit_file_id: Option<String>,
    /// Description.
    pub content: Option<String>,
    /// Facilities.
    pub facility: Option<String>,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lon: Option<f64>,
    /// Street address.
    pub address: Option<String>,
    /// Opening hours.
    pub operating_hours: Option<String>,
    /// Publication flag, false when omitted.
    pub published: Option<bool>,
    /// Category ids.
    pub categories: Option<Vec<i64>>,
}

impl DestinationInput {
    /// Validate into a draft.
    ///
    /// The image is required on create and optional on update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every failing field, or a
    /// storage error from a reference lookup.
    pub fn validate(&self, refs: &impl References, mode: Mode) -> Result<DestinationDraft> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", self.name.as_ref(), Some(MAX_STRING));
        let content = required_text(&mut errors, "content", self.content.as_ref(), None);
        let facility = required_text(&mut errors, "facility", self.facility.as_ref(), None);
        let lat = required_number(&mut errors, "lat", self.lat, -90.0, 90.0);
        let lon = required_number(&mut errors, "lon", self.lon, -180.0, 180.0);
        let address = optional_text(&mut errors, "address", self.address.as_ref(), MAX_STRING);
        let operating_hours = optional_text(
            &mut errors,
            "operating_hours",
            self.operating_hours.as_ref(),
            MAX_STRING,
        );

        let pic_id = match self.pic_id {
            None => {
                errors.add("pic_id", required_msg("pic_id"));
                0
            }
            Some(id) => {
                if !refs.user_exists(id)? {
                    errors.add("pic_id", invalid_selection_msg("pic_id"));
                }
                id
            }
        };

        let mut categories = Vec::new();
        match self.categories.as_deref() {
            None | Some([]) => errors.add("categories", required_msg("categories")),
            Some(ids) => {
                for id in ids {
                    if !categories.contains(id) {
                        categories.push(*id);
                    }
                }
                let missing = refs.missing_categories(&categories)?;
                for (index, id) in ids.iter().enumerate() {
                    if missing.contains(id) {
                        let field = format!("categories.{index}");
                        errors.add(&field, invalid_selection_msg(&field));
                    }
                }
            }
        }

        let thumb_image = match present(self.thumb_image.as_ref()) {
            None => {
                if mode == Mode::Create {
                    errors.add("thumb_image", required_msg("thumb_image"));
                }
                None
            }
            Some(url) => {
                if !is_image_reference(url) {
                    errors.add("thumb_image", "The thumb image must be an image URL.");
                }
                Some(url.to_string())
            }
        };
        let imagekit_file_id = thumb_image
            .as_ref()
            .and_then(|_| present(self.imagekit_file_id.as_ref()))
            .map(ToString::to_string);

        errors.finish(|| DestinationDraft {
            pic_id,
            name,
            thumb_image,
            imagekit_file_id,
            content,
            facility,
            lat,
            lon,
            address,
            operating_hours,
            published: self.published.unwrap_or(false),
            categories,
        })
    }
}

/// Raw category payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryInput {
    /// Display name.
    pub name: Option<String>,
    /// Image URL.
    pub img: Option<String>,
}

impl CategoryInput {
    /// Validate into a draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every failing field.
    pub fn validate(&self) -> Result<CategoryDraft> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", self.name.as_ref(), Some(MAX_STRING));
        let img = present(self.img.as_ref()).map(ToString::to_string);
        if let Some(url) = &img {
            if !is_image_reference(url) {
                errors.add("img", "The img must be an image URL.");
            }
        }
        errors.finish(|| CategoryDraft { name, img })
    }
}

/// Raw testimonial payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestimonialInput {
    /// Target destination.
    pub destination_id: Option<String>,
    /// Author name.
    pub name: Option<String>,
    /// Comment.
    pub comment: Option<String>,
    /// Rating, 1 to 5.
    pub rating: Option<i64>,
}

impl TestimonialInput {
    /// Validate into a draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every failing field, or a
    /// storage error from a reference lookup.
    pub fn validate(&self, refs: &impl References) -> Result<TestimonialDraft> {
        let mut errors = ValidationErrors::new();

        let destination_id = match present(self.destination_id.as_ref()) {
            None => {
                errors.add("destination_id", required_msg("destination_id"));
                String::new()
            }
            Some(id) => {
                if !refs.destination_exists(id)? {
                    errors.add("destination_id", invalid_selection_msg("destination_id"));
                }
                id.to_string()
            }
        };
        let name = required_text(&mut errors, "name", self.name.as_ref(), Some(MAX_STRING));
        let comment = required_text(
            &mut errors,
            "comment",
            self.comment.as_ref(),
            Some(MAX_STRING),
        );
        let rating = match self.rating {
            None => {
                errors.add("rating", required_msg("rating"));
                0
            }
            Some(r) => match u8::try_from(r) {
                Ok(r @ 1..=5) => r,
                _ => {
                    errors.add("rating", "The rating field must be between 1 and 5.");
                    0
                }
            },
        };

        errors.finish(|| TestimonialDraft {
            destination_id,
            name,
            comment,
            rating,
        })
    }
}

/// Raw user payload. The password is hashed by the caller after validation.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInput {
    /// Display name.
    pub name: Option<String>,
    /// Login email.
    pub email: Option<String>,
    /// Plain-text password.
    pub password: Option<String>,
    /// Role name.
    pub role: Option<String>,
    /// Contact number.
    pub phone_number: Option<String>,
}

impl std::fmt::Debug for UserInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserInput")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("role", &self.role)
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

/// A validated user payload whose password, if any, still needs hashing.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidUser {
    /// The draft, with `password_hash` unset.
    pub draft: UserDraft,
    /// Plain-text password to hash, `None` to keep the current one.
    pub password: Option<String>,
}

impl std::fmt::Debug for ValidUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidUser")
            .field("draft", &self.draft)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl UserInput {
    /// Validate. `editing` is the id of the user being updated, which is
    /// excluded from the email uniqueness check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing every failing field, or a
    /// storage error from the uniqueness lookup.
    pub fn validate(&self, refs: &impl References, editing: Option<i64>) -> Result<ValidUser> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", self.name.as_ref(), Some(MAX_STRING));

        let email = match present(self.email.as_ref()) {
            None => {
                errors.add("email", required_msg("email"));
                String::new()
            }
            Some(email) => {
                if !is_valid_email(email) {
                    errors.add("email", "The email field must be a valid email address.");
                } else if email.chars().count() > MAX_STRING {
                    errors.add("email", max_msg("email", MAX_STRING));
                } else if refs.email_taken(email, editing)? {
                    errors.add("email", "The email has already been taken.");
                }
                email.to_string()
            }
        };

        let password = match self.password.as_deref().filter(|p| !p.is_empty()) {
            None => {
                if editing.is_none() {
                    errors.add("password", required_msg("password"));
                }
                None
            }
            Some(password) => {
                if password.chars().count() < MIN_PASSWORD {
                    errors.add(
                        "password",
                        format!("The password field must be at least {MIN_PASSWORD} characters."),
                    );
                }
                Some(password.to_string())
            }
        };

        let role = match present(self.role.as_ref()) {
            None => {
                errors.add("role", required_msg("role"));
                Role::Admin
            }
            Some(raw) => raw.parse::<Role>().unwrap_or_else(|_| {
                errors.add("role", invalid_selection_msg("role"));
                Role::Admin
            }),
        };

        let phone_number = optional_text(
            &mut errors,
            "phone_number",
            self.phone_number.as_ref(),
            MAX_PHONE,
        );

        errors.finish(|| ValidUser {
            draft: UserDraft {
                name,
                email,
                password_hash: None,
                role,
                phone_number,
            },
            password,
        })
    }
}
