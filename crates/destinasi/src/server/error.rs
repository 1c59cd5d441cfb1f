//! HTTP mapping for [`Error`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::error::Error;

impl Error {
    /// The HTTP status this error answers with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ImageService(_) => StatusCode::BAD_GATEWAY,
            Self::ImageServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Validation(errors) => {
                let message = match errors.len() {
                    0 | 1 => errors.first_message().unwrap_or_default().to_string(),
                    n => format!(
                        "{} (and {} more errors)",
                        errors.first_message().unwrap_or_default(),
                        n - 1
                    ),
                };
                json!({ "message": message, "errors": errors })
            }
            Self::Unauthenticated => json!({ "message": "Unauthenticated." }),
            Self::Forbidden { reason } => {
                warn!("Forbidden: {}", reason);
                json!({ "message": "This action is unauthorized." })
            }
            Self::NotFound { .. } => json!({ "message": self.to_string() }),
            Self::ImageService(e) => {
                error!("Image CDN call failed: {}", e);
                json!({ "success": false, "message": "Image service request failed" })
            }
            Self::ImageServiceUnavailable => {
                json!({ "success": false, "message": "Image service is not configured" })
            }
            other => {
                error!("Request failed: {}", other);
                json!({ "message": "Server Error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::invalid("name", "The name field is required.").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(Error::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::forbidden("no").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::not_found("destination", "x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::ImageService(destinasi_imagekit::ImageKitError::api(500, "down")).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::ImageServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::internal("bug").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_constraint_violation_is_500() {
        let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
