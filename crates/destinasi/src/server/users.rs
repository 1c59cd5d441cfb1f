//! User account routes, superadmin only.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

use super::extract::{CurrentUser, Json, Query};
use super::state::AppState;
use crate::auth::hash_password_blocking;
use crate::error::{Error, Result};
use crate::listing::{ListQuery, Listing};
use crate::models::User;
use crate::policy::require_superadmin;
use crate::validation::UserInput;

/// `GET /user`
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<User>>> {
    require_superadmin(&current.actor())?;
    let listing = state.with_storage(|storage| storage.list_users(&query))?;
    Ok(Json(listing))
}

/// `POST /user`
pub async fn store(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<User>)> {
    require_superadmin(&current.actor())?;
    let valid = state.with_storage(|storage| input.validate(storage, None))?;
    let mut draft = valid.draft;
    if let Some(password) = valid.password {
        draft.password_hash = Some(hash_password_blocking(password).await?);
    }
    let user = state.with_storage(|storage| storage.create_user(&draft))?;
    info!("User {} created account {}", current.user.id, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// `PUT /user/{id}`
///
/// An omitted password keeps the current one.
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UserInput>,
) -> Result<Json<User>> {
    require_superadmin(&current.actor())?;
    let valid = state.with_storage(|storage| {
        if !storage.user_exists(id)? {
            return Err(Error::not_found("user", id));
        }
        input.validate(storage, Some(id))
    })?;
    let mut draft = valid.draft;
    if let Some(password) = valid.password {
        draft.password_hash = Some(hash_password_blocking(password).await?);
    }
    let user = state.with_storage(|storage| storage.update_user(id, &draft))?;
    Ok(Json(user))
}

/// `DELETE /user/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    require_superadmin(&current.actor())?;
    if state.with_storage(|storage| storage.delete_user(id))? {
        info!("User {} deleted account {}", current.user.id, id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found("user", id))
    }
}
