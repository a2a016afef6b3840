use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    /// Reference to a managed venue, or `None` when the organizer typed a
    /// free-form venue into `venue_name` / `venue_location`.
    pub venue_id: Option<Uuid>,
    pub venue_name: Option<String>,
    pub venue_location: Option<String>,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub timezone: String,
    pub recurrence_rule: Option<String>,
    /// Overrides the venue capacity when set. Per-ticket-type capacity is
    /// what the ledger enforces; this is display-level.
    pub capacity: Option<i32>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// An event accepts registrations while it is active and has not started.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == EventStatus::Active && self.start_ts > now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Cancelled,
    Completed,
}
