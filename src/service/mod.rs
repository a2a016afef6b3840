pub mod catalog;
pub mod queries;
pub mod registration;

use thiserror::Error;

use crate::store::StoreError;
use crate::utils::error::AppError;

pub use catalog::{CatalogService, EventUpdate, NewEvent, NewTicketType, NewVenue, VenueUpdate};
pub use queries::QueryService;
pub use registration::{RegisterRequest, RegistrationService};

/// Business-rule violations returned as typed results for direct display,
/// plus pass-through of store failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("you already hold an active registration for this ticket type")]
    DuplicateRegistration,

    #[error("this ticket type is sold out")]
    CapacityExceeded,

    #[error("this event is not open for registration")]
    EventNotOpen,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("venue is still referenced by events")]
    VenueInUse,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::DuplicateRegistration => {
                AppError::DuplicateRegistration(err.to_string())
            }
            ServiceError::CapacityExceeded => AppError::CapacityExceeded(err.to_string()),
            ServiceError::EventNotOpen => AppError::EventNotOpen(err.to_string()),
            ServiceError::NotFound(entity) => AppError::NotFound(format!("{entity} not found")),
            ServiceError::Validation(msg) => AppError::ValidationError(msg),
            ServiceError::VenueInUse => AppError::Conflict(err.to_string()),
            ServiceError::Store(store) => store.into(),
        }
    }
}
