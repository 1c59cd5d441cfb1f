//! Destination administration routes.
//!
//! Admins see and manage only their own destinations; a superadmin manages
//! all of them. CDN files of replaced or deleted images are removed after
//! the database change, best effort.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use tracing::{info, warn};

use super::extract::{CurrentUser, Json, Query};
use super::state::AppState;
use crate::error::{Error, Result};
use crate::listing::{ListQuery, Listing};
use crate::media::attach_image_urls;
use crate::models::{Category, Destination, User};
use crate::policy::{authorize_destination, pinned_pic, selectable_pics};
use crate::storage::Storage;
use crate::validation::{DestinationInput, Mode};

/// Options for the destination form.
#[derive(Debug, Clone, Serialize)]
pub struct DestinationForm {
    /// The destination being edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    /// Every category.
    pub categories: Vec<Category>,
    /// Users the actor may pick as PIC.
    pub users: Vec<User>,
}

fn owned_destination(storage: &Storage, current: &CurrentUser, id: &str) -> Result<Destination> {
    let destination = storage
        .get_destination(id)?
        .ok_or_else(|| Error::not_found("destination", id))?;
    authorize_destination(&current.actor(), &destination)?;
    Ok(destination)
}

/// Remove a CDN file, logging instead of failing.
async fn discard_image(state: &AppState, file_id: &str) {
    let Some(images) = state.images() else {
        warn!(file_id, "Image CDN not configured, leaving file in place");
        return;
    };
    if let Err(e) = images.delete_file(file_id).await {
        warn!(file_id, error = %e, "Failed to delete destination image");
    }
}

/// `GET /destination`
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<Destination>>> {
    let scope = current.actor().scope();
    let mut listing = state.with_storage(|storage| storage.list_destinations(&query, scope))?;
    attach_image_urls(state.images(), &mut listing.page.data);
    Ok(Json(listing))
}

/// `GET /destination/create`
pub async fn create_form(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DestinationForm>> {
    let form = state.with_storage(|storage| {
        Ok(DestinationForm {
            destination: None,
            categories: storage.all_categories()?,
            users: selectable_pics(&current.actor(), storage.all_users()?),
        })
    })?;
    Ok(Json(form))
}

/// `POST /destination`
pub async fn store(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(mut input): Json<DestinationInput>,
) -> Result<(StatusCode, Json<Destination>)> {
    input.pic_id = pinned_pic(&current.actor(), input.pic_id);
    let mut destination = state.with_storage(|storage| {
        let draft = input.validate(storage, Mode::Create)?;
        storage.create_destination(&draft)
    })?;
    info!(
        "User {} created destination {}",
        current.user.id, destination.id
    );
    attach_image_urls(state.images(), std::slice::from_mut(&mut destination));
    Ok((StatusCode::CREATED, Json(destination)))
}

/// `GET /destination/{id}`
pub async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Destination>> {
    let mut destination =
        state.with_storage(|storage| owned_destination(storage, &current, &id))?;
    attach_image_urls(state.images(), std::slice::from_mut(&mut destination));
    Ok(Json(destination))
}

/// `GET /destination/{id}/edit`
pub async fn edit_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DestinationForm>> {
    let form = state.with_storage(|storage| {
        let destination = owned_destination(storage, &current, &id)?;
        Ok(DestinationForm {
            destination: Some(destination),
            categories: storage.all_categories()?,
            users: selectable_pics(&current.actor(), storage.all_users()?),
        })
    })?;
    Ok(Json(form))
}

/// `PUT /destination/{id}`
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(mut input): Json<DestinationInput>,
) -> Result<Json<Destination>> {
    input.pic_id = pinned_pic(&current.actor(), input.pic_id);
    let (previous, mut updated) = state.with_storage(|storage| {
        let previous = owned_destination(storage, &current, &id)?;
        let draft = input.validate(storage, Mode::Update)?;
        let updated = storage.update_destination(&id, &draft)?;
        Ok((previous, updated))
    })?;

    if let Some(old_file) = previous.imagekit_file_id.as_deref() {
        if updated.imagekit_file_id.as_deref() != Some(old_file) {
            discard_image(&state, old_file).await;
        }
    }
    attach_image_urls(state.images(), std::slice::from_mut(&mut updated));
    Ok(Json(updated))
}

/// `DELETE /destination/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let destination = state.with_storage(|storage| {
        let destination = owned_destination(storage, &current, &id)?;
        storage.delete_destination(&id)?;
        Ok(destination)
    })?;
    info!("User {} deleted destination {}", current.user.id, id);

    if let Some(file_id) = destination.imagekit_file_id.as_deref() {
        discard_image(&state, file_id).await;
    }
    Ok(StatusCode::NO_CONTENT)
}
