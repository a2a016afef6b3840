use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::EventWithTickets;
use crate::service::{EventUpdate, NewEvent, NewTicketType};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

/// Active upcoming events with per-ticket-type availability.
pub async fn list_open_events(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let events = state.queries.open_events().await?;
    Ok(success(events, "Events loaded").into_response())
}

pub async fn get_event(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state.queries.event_with_tickets(id).await?;
    Ok(success(event, "Event loaded").into_response())
}

pub async fn create_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NewEvent>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let (event, ticket_types) = state.catalog.create_event(auth.user_id, payload).await?;
    let body = EventWithTickets {
        event,
        ticket_types: ticket_types.into_iter().map(Into::into).collect(),
    };
    Ok(created(body, "Event created").into_response())
}

pub async fn update_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventUpdate>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let event = state.catalog.update_event(id, payload).await?;
    Ok(success(event, "Event updated").into_response())
}

pub async fn delete_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    state.catalog.delete_event(id).await?;
    Ok(empty_success("Event deleted").into_response())
}

pub async fn create_ticket_type(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<NewTicketType>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let ticket_type = state.catalog.create_ticket_type(event_id, payload).await?;
    Ok(created(ticket_type, "Ticket type created").into_response())
}

pub async fn dashboard_stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let stats = state.queries.dashboard_stats().await?;
    Ok(success(stats, "Stats loaded").into_response())
}
