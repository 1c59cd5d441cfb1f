//! Login and logout routes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::extract::{CurrentUser, Json};
use super::state::AppState;
use crate::auth::{self, Session};
use crate::error::Result;
use crate::validation::ValidationErrors;

/// Login payload.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Account email.
    pub email: Option<String>,
    /// Account password.
    pub password: Option<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let mut errors = ValidationErrors::new();
    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    }
    if password.is_empty() {
        errors.add("password", "The password field is required.");
    }
    errors.finish(|| ())?;

    // Argon2 runs on the blocking pool, outside the storage lock
    let found = state.with_storage(|storage| storage.get_user_by_email(email))?;
    let user = match found {
        Some((user, hash)) => auth::verify_password_blocking(password.to_string(), hash)
            .await?
            .then_some(user),
        None => None,
    };
    let user = user.ok_or_else(auth::rejected_login)?;

    let lifetime = state.config().session_lifetime();
    let session = state.with_storage(|storage| auth::open_session(storage, user, lifetime))?;
    Ok(Json(session))
}

/// `POST /logout`
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> Result<StatusCode> {
    state.with_storage(|storage| auth::logout(storage, &current.token))?;
    Ok(StatusCode::NO_CONTENT)
}
