//! Error types for the ImageKit client.

use thiserror::Error;

/// Errors returned by [`crate::ImageKit`] operations.
#[derive(Error, Debug)]
pub enum ImageKitError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("ImageKit request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// ImageKit answered with a non-success status.
    #[error("ImageKit API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by ImageKit.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// The client configuration is unusable.
    #[error("invalid ImageKit configuration: {0}")]
    InvalidConfig(String),

    /// A perceptual hash was not a 64-bit hex string.
    #[error("invalid pHash value: {0}")]
    InvalidPhash(String),

    /// HMAC signing failed.
    #[error("signature error: {0}")]
    Signature(String),

    /// URL construction failed.
    #[error("invalid URL options: {0}")]
    Url(String),

    /// The response body did not match the expected shape.
    #[error("unexpected ImageKit response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result alias for ImageKit operations.
pub type Result<T> = std::result::Result<T, ImageKitError>;

impl ImageKitError {
    /// Create an API error from a status and message.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether ImageKit reported the file as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
