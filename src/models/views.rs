//! Read-side projections served by the query facade. Display-only; none of
//! these gate a capacity decision.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Event, RegistrationStatus, TicketKind, TicketType};

/// A ticket type with its computed remaining capacity.
#[derive(Debug, Clone, Serialize)]
pub struct TicketAvailability {
    #[serde(flatten)]
    pub ticket_type: TicketType,
    /// `capacity - sold_count`, clamped at zero. `None` means unlimited.
    pub remaining: Option<i32>,
}

impl From<TicketType> for TicketAvailability {
    fn from(ticket_type: TicketType) -> Self {
        let remaining = ticket_type.remaining();
        Self {
            ticket_type,
            remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventWithTickets {
    #[serde(flatten)]
    pub event: Event,
    pub ticket_types: Vec<TicketAvailability>,
}

/// One row of a participant's registration history.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRegistrationRow {
    pub id: Uuid,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_start_ts: DateTime<Utc>,
    pub venue_label: Option<String>,
    pub ticket_name: String,
    pub ticket_kind: TicketKind,
}

/// One row of the organizer-facing registration roll.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RollEntry {
    pub id: Uuid,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub participant_name: Option<String>,
    pub participant_email: String,
    pub event_title: String,
    pub event_start_ts: DateTime<Utc>,
    pub ticket_name: String,
    pub ticket_kind: TicketKind,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardStats {
    pub events: i64,
    pub venues: i64,
    pub registrations: i64,
}
