use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{AppRole, RegistrationStatus};
use crate::service::RegisterRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    /// Optional client-supplied key; retrying a request with the same key
    /// replays the original outcome instead of reserving twice.
    pub idempotency_key: Option<Uuid>,
}

pub async fn register(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .register(RegisterRequest {
            user_id: auth.user_id,
            event_id: payload.event_id,
            ticket_type_id: payload.ticket_type_id,
            idempotency_key: payload.idempotency_key,
        })
        .await?;

    let message = match registration.status {
        RegistrationStatus::Waitlist => "Added to the waitlist",
        _ => "Successfully registered for event",
    };
    Ok(created(registration, message).into_response())
}

pub async fn cancel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = state.registrations.get(id).await?;
    if registration.user_id != auth.user_id && auth.role != AppRole::Organizer {
        return Err(AppError::Forbidden(
            "you may only cancel your own registrations".to_string(),
        ));
    }

    let cancelled = state.registrations.cancel(id).await?;
    Ok(success(cancelled, "Registration cancelled").into_response())
}

pub async fn my_registrations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let rows = state.queries.user_registrations(auth.user_id).await?;
    Ok(success(rows, "Registrations loaded").into_response())
}

pub async fn registration_roll(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    auth.require_organizer()?;
    let roll = state.queries.registration_roll().await?;
    Ok(success(roll, "Registration roll loaded").into_response())
}
