//! Category routes, superadmin only.

use axum::extract::{Path, State};
use axum::http::StatusCode;

use super::extract::{CurrentUser, Json, Query};
use super::state::AppState;
use crate::error::{Error, Result};
use crate::listing::{ListQuery, Listing};
use crate::models::Category;
use crate::policy::require_superadmin;
use crate::validation::CategoryInput;

/// `GET /category`
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<Category>>> {
    require_superadmin(&current.actor())?;
    let listing = state.with_storage(|storage| storage.list_categories(&query))?;
    Ok(Json(listing))
}

/// `POST /category`
pub async fn store(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    require_superadmin(&current.actor())?;
    let draft = input.validate()?;
    let category = state.with_storage(|storage| storage.create_category(&draft))?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /category/{id}`
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    require_superadmin(&current.actor())?;
    let draft = input.validate()?;
    let category = state.with_storage(|storage| storage.update_category(id, &draft))?;
    Ok(Json(category))
}

/// `DELETE /category/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    require_superadmin(&current.actor())?;
    if state.with_storage(|storage| storage.delete_category(id))? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found("category", id))
    }
}
