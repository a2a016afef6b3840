use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::service::{NewVenue, VenueUpdate};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

pub async fn list_venues(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let venues = state.catalog.list_venues().await?;
    Ok(success(venues, "Venues loaded").into_response())
}

pub async fn create_venue(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NewVenue>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let venue = state.catalog.create_venue(payload).await?;
    Ok(created(venue, "Venue created").into_response())
}

pub async fn update_venue(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VenueUpdate>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let venue = state.catalog.update_venue(id, payload).await?;
    Ok(success(venue, "Venue updated").into_response())
}

pub async fn delete_venue(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    state.catalog.delete_venue(id).await?;
    Ok(empty_success("Venue deleted").into_response())
}
