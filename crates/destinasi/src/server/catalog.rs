//! Public catalog routes.

use axum::extract::{Path, State};

use super::extract::{Json, MaybeUser, Query};
use super::state::AppState;
use crate::catalog::{Catalog, CatalogPage, CatalogQuery, DestinationDetail, HomePage};
use crate::error::Result;

/// `GET /`
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<HomePage>> {
    let origin = query.origin();
    let page = state.with_storage(|storage| {
        Catalog::new(storage, state.images(), &state.config().catalog).home(origin)
    })?;
    Ok(Json(page))
}

/// `GET /katalog`
pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogPage>> {
    let page = state.with_storage(|storage| {
        Catalog::new(storage, state.images(), &state.config().catalog).browse(&query)
    })?;
    Ok(Json(page))
}

/// `GET /katalog/{id}`
pub async fn detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<DestinationDetail>> {
    let origin = query.origin();
    let detail = state.with_storage(|storage| {
        Catalog::new(storage, state.images(), &state.config().catalog).detail(
            &id,
            origin,
            viewer.actor(),
        )
    })?;
    Ok(Json(detail))
}
