use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Event not open: {0}")]
    EventNotOpen(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable")]
    StoreUnavailable,

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateRegistration(_) => StatusCode::CONFLICT,
            AppError::CapacityExceeded(_) => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::EventNotOpen(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateRegistration(_) => "DUPLICATE_REGISTRATION",
            AppError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::EventNotOpen(_) => "EVENT_NOT_OPEN",
            AppError::StoreUnavailable => "STORE_UNAVAILABLE",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            // Business-rule rejections are normal traffic.
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::DuplicateRegistration(msg)
            | AppError::CapacityExceeded(msg)
            | AppError::Conflict(msg)
            | AppError::EventNotOpen(msg) => {
                debug!(error = ?self, message = %msg, "Request rejected");
            }
            AppError::StoreUnavailable => {
                error!(error = ?self, "Store unavailable after retries");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Internal error");
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => AppError::NotFound(format!("{entity} not found")),
            StoreError::DuplicateActiveRegistration => AppError::DuplicateRegistration(
                "An active registration already exists for this ticket type".to_string(),
            ),
            StoreError::StillReferenced => {
                AppError::Conflict("Resource is still referenced".to_string())
            }
            StoreError::Unavailable(_) => AppError::StoreUnavailable,
            StoreError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::DuplicateRegistration(msg)
            | AppError::CapacityExceeded(msg)
            | AppError::Conflict(msg)
            | AppError::EventNotOpen(msg) => msg.clone(),
            AppError::StoreUnavailable => {
                "The service is temporarily unavailable, please retry".to_string()
            }
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}
