//! Error types for destinasi.
//!
//! This module defines all error types used throughout the destinasi crate.
//! The HTTP layer maps them onto status codes in `server::error`.

use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationErrors;

/// The main error type for destinasi operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Request Errors ===
    /// Submitted input failed validation.
    #[error("the given data was invalid: {0}")]
    Validation(ValidationErrors),

    /// The caller is not authenticated.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The caller may not perform this action.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Why access was refused.
        reason: String,
    },

    /// A record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    // === Image Service Errors ===
    /// The image CDN rejected or failed a call.
    #[error("image service error: {0}")]
    ImageService(#[from] destinasi_imagekit::ImageKitError),

    /// Image features were used without CDN credentials configured.
    #[error("image service is not configured")]
    ImageServiceUnavailable,

    // === Security Errors ===
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for destinasi operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl Error {
    /// Create a forbidden error.
    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// A single-field validation error.
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    /// Check if this error is an authorization refusal.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// Check if this error is a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error carries field-level validation messages.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Unauthenticated;
        assert_eq!(err.to_string(), "unauthenticated");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_forbidden() {
        let err = Error::forbidden("not the PIC of this destination");
        assert!(err.is_forbidden());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("not the PIC"));
    }

    #[test]
    fn test_not_found() {
        let err = Error::not_found("destination", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "destination not found: abc");
    }

    #[test]
    fn test_invalid_single_field() {
        let err = Error::invalid("rating", "The rating must be between 1 and 5.");
        assert!(err.is_validation());
        match err {
            Error::Validation(errors) => {
                assert_eq!(errors.get("rating").len(), 1);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_from_image_kit_error() {
        let err: Error = destinasi_imagekit::ImageKitError::api(500, "boom").into();
        assert!(matches!(err, Error::ImageService(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
