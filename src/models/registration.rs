use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Join record linking a user, an event, and a ticket type. Its lifecycle is
/// independent of all three; only the status transitions matter for capacity
/// accounting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    /// Active registrations hold the (user, ticket type) uniqueness slot.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            RegistrationStatus::Confirmed | RegistrationStatus::Waitlist
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
    Waitlist,
}
