//! Testimonial routes. Submitting is public; everything else is limited to
//! the PIC of the testimonial's destination or a superadmin.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use super::extract::{CurrentUser, Json, MaybeUser, Query};
use super::state::AppState;
use crate::error::{Error, Result};
use crate::listing::{ListQuery, Listing};
use crate::models::{DestinationOption, Testimonial};
use crate::policy::{authorize_testimonial, authorize_testimonial_target};
use crate::storage::Storage;
use crate::validation::TestimonialInput;

/// Options for the testimonial form.
#[derive(Debug, Clone, Serialize)]
pub struct TestimonialForm {
    /// The testimonial being edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testimonial: Option<Testimonial>,
    /// Destinations the actor may attach a testimonial to.
    pub destinations: Vec<DestinationOption>,
}

fn managed_testimonial(storage: &Storage, current: &CurrentUser, id: i64) -> Result<Testimonial> {
    let testimonial = storage
        .get_testimonial(id)?
        .ok_or_else(|| Error::not_found("testimonial", id))?;
    let pic_id = testimonial
        .destination
        .as_ref()
        .map(|d| d.pic_id)
        .ok_or_else(|| Error::internal("testimonial loaded without its destination"))?;
    authorize_testimonial(&current.actor(), pic_id)?;
    Ok(testimonial)
}

/// `GET /testimonial`
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<Testimonial>>> {
    let scope = current.actor().scope();
    let listing = state.with_storage(|storage| storage.list_testimonials(&query, scope))?;
    Ok(Json(listing))
}

/// `GET /testimonial/create`
pub async fn create_form(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<TestimonialForm>> {
    let scope = current.actor().scope();
    let destinations = state.with_storage(|storage| storage.destination_options(scope))?;
    Ok(Json(TestimonialForm {
        testimonial: None,
        destinations,
    }))
}

/// `POST /testimonial`
pub async fn store(
    State(state): State<AppState>,
    visitor: MaybeUser,
    Json(input): Json<TestimonialInput>,
) -> Result<(StatusCode, Json<Testimonial>)> {
    let testimonial = state.with_storage(|storage| {
        let draft = input.validate(storage)?;
        storage.create_testimonial(&draft)
    })?;
    match visitor.0 {
        Some(user) => info!(
            "User {} added testimonial {} on {}",
            user.id, testimonial.id, testimonial.destination_id
        ),
        None => info!(
            "Visitor added testimonial {} on {}",
            testimonial.id, testimonial.destination_id
        ),
    }
    Ok((StatusCode::CREATED, Json(testimonial)))
}

/// `GET /testimonial/{id}`
pub async fn show(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Testimonial>> {
    let testimonial = state.with_storage(|storage| managed_testimonial(storage, &current, id))?;
    Ok(Json(testimonial))
}

/// `GET /testimonial/{id}/edit`
pub async fn edit_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<TestimonialForm>> {
    let scope = current.actor().scope();
    let form = state.with_storage(|storage| {
        Ok(TestimonialForm {
            testimonial: Some(managed_testimonial(storage, &current, id)?),
            destinations: storage.destination_options(scope)?,
        })
    })?;
    Ok(Json(form))
}

/// `PUT /testimonial/{id}`
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<TestimonialInput>,
) -> Result<Json<Testimonial>> {
    let testimonial = state.with_storage(|storage| {
        managed_testimonial(storage, &current, id)?;
        let draft = input.validate(storage)?;
        let target = storage
            .get_destination(&draft.destination_id)?
            .ok_or_else(|| Error::not_found("destination", &draft.destination_id))?;
        authorize_testimonial_target(&current.actor(), target.pic_id)?;
        storage.update_testimonial(id, &draft)
    })?;
    Ok(Json(testimonial))
}

/// `DELETE /testimonial/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    state.with_storage(|storage| {
        managed_testimonial(storage, &current, id)?;
        storage.delete_testimonial(id)
    })?;
    Ok(StatusCode::NO_CONTENT)
}
