//! Request extractors: bearer tokens, and JSON bodies and query strings
//! whose rejections answer with the validation error shape.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::state::AppState;
use crate::auth;
use crate::error::{Error, Result};
use crate::models::User;
use crate::policy::Actor;

/// The bearer token in the `Authorization` header, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn resolve(parts: &Parts, state: &AppState) -> Result<Option<(User, String)>> {
    let Some(token) = bearer_token(parts) else {
        return Ok(None);
    };
    let user = state.with_storage(|storage| auth::authenticate(storage, token))?;
    Ok(user.map(|user| (user, token.to_string())))
}

/// A signed-in user. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// The user.
    pub user: User,
    /// The token the request was made with.
    pub token: String,
}

impl CurrentUser {
    /// The user as an authorization subject.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        match resolve(parts, state)? {
            Some((user, token)) => Ok(Self { user, token }),
            None => Err(Error::Unauthenticated),
        }
    }
}

/// The signed-in user, when there is one. An unknown or expired token is
/// treated as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    /// The user as an authorization subject.
    #[must_use]
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(Actor::from)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts, state)?.map(|(user, _)| user)))
    }
}

/// Turn a deserializer message into a validation error on the field it
/// names. axum reports `<context>: <path>: <reason>`; a message without a
/// path is charged to `fallback`.
fn rejected_field(detail: &str, fallback: &str) -> Error {
    let field = detail
        .split(": ")
        .nth(1)
        .filter(|path| !path.is_empty() && !path.contains(char::is_whitespace))
        .map(|path| path.replace('[', ".").replace(']', ""))
        .unwrap_or_else(|| fallback.to_string());
    Error::invalid(&field, format!("The {} field is invalid.", field.replace('_', " ")))
}

fn json_rejection(rejection: JsonRejection) -> Response {
    debug!("Rejected JSON body: {}", rejection.body_text());
    let error = match rejection {
        JsonRejection::JsonDataError(e) => rejected_field(&e.body_text(), "body"),
        JsonRejection::JsonSyntaxError(_) => {
            Error::invalid("body", "The request body must be valid JSON.")
        }
        JsonRejection::MissingJsonContentType(_) => Error::invalid(
            "body",
            "The request body must be sent as application/json.",
        ),
        // Oversized or unreadable bodies keep axum's own status
        other => return other.into_response(),
    };
    error.into_response()
}

/// A JSON request or response body.
///
/// Unlike `axum::Json`, a body that fails to deserialize is answered with a
/// 422 carrying `{"message", "errors"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// A query string, rejected like [`Json`] when it does not deserialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!("Rejected query string: {}", rejection.body_text());
                Err(rejected_field(&rejection.body_text(), "query"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: Error) -> Vec<String> {
        match err {
            Error::Validation(errors) => serde_json::to_value(&errors)
                .unwrap()
                .as_object()
                .unwrap()
                .keys()
                .cloned()
                .collect(),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_rejected_field_uses_path() {
        let err = rejected_field(
            "Failed to deserialize the JSON body into the target type: rating: invalid type: string \"5\", expected i64 at line 1 column 13",
            "body",
        );
        assert_eq!(fields(err), vec!["rating".to_string()]);

        let err = rejected_field(
            "Failed to deserialize the JSON body into the target type: categories[1]: invalid type: string \"x\", expected i64",
            "body",
        );
        assert_eq!(fields(err), vec!["categories.1".to_string()]);
    }

    #[test]
    fn test_rejected_field_without_path_uses_fallback() {
        let err = rejected_field(
            "Failed to deserialize query string: invalid digit found in string",
            "query",
        );
        assert_eq!(fields(err), vec!["query".to_string()]);

        let err = rejected_field("Failed to deserialize the JSON body into the target type: expected value at line 1 column 1", "body");
        assert_eq!(fields(err), vec!["body".to_string()]);
    }
}
