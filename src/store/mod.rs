//! Durable storage for the ticket pool: venues, profiles, events, ticket
//! types, and registrations.
//!
//! The trait exposes exactly one atomic conditional-update primitive
//! ([`TicketPoolStore::try_reserve`]) for the capacity ledger. `sold_count`
//! must never be written through any other path; every other method is plain
//! CRUD or a read projection.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    DashboardStats, Event, Profile, Registration, RegistrationStatus, RollEntry, TicketType,
    UserRegistrationRow, Venue,
};

pub use memory::InMemoryTicketStore;
pub use postgres::PgTicketStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The partial unique index on active (user, ticket type) pairs fired.
    #[error("an active registration already exists for this ticket type")]
    DuplicateActiveRegistration,

    /// Deletion blocked by rows that still reference the target.
    #[error("row is still referenced")]
    StillReferenced,

    /// Transient infrastructure failure; safe to retry idempotent calls.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store failure: {0}")]
    Internal(String),
}

/// Result of the atomic check-and-increment on `sold_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    CapacityExceeded,
}

/// Result of the atomic decrement on `sold_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// The counter was already zero. The decrement is clamped; the caller
    /// logs this as an internal inconsistency.
    AlreadyAtZero,
}

#[async_trait]
pub trait TicketPoolStore: Send + Sync {
    // -- venues ----------------------------------------------------------

    async fn insert_venue(&self, venue: &Venue) -> Result<(), StoreError>;
    async fn update_venue(&self, venue: &Venue) -> Result<(), StoreError>;
    /// Fails with [`StoreError::StillReferenced`] while events point at the
    /// venue.
    async fn delete_venue(&self, id: Uuid) -> Result<(), StoreError>;
    async fn get_venue(&self, id: Uuid) -> Result<Option<Venue>, StoreError>;
    async fn list_venues(&self) -> Result<Vec<Venue>, StoreError>;

    // -- profiles --------------------------------------------------------

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError>;
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    // -- events ----------------------------------------------------------

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;
    async fn update_event(&self, event: &Event) -> Result<(), StoreError>;
    /// Cascades to the event's ticket types and registrations.
    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError>;
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;
    async fn list_open_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>, StoreError>;

    // -- ticket types ----------------------------------------------------

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<(), StoreError>;
    async fn get_ticket_type(&self, id: Uuid) -> Result<Option<TicketType>, StoreError>;
    async fn list_ticket_types(&self, event_ids: &[Uuid]) -> Result<Vec<TicketType>, StoreError>;

    // -- capacity primitive ---------------------------------------------

    /// Atomically increments `sold_count` if and only if it is below
    /// capacity (or capacity is unlimited). Check and increment happen in
    /// one conditional update; callers never read-then-write.
    async fn try_reserve(&self, ticket_type_id: Uuid) -> Result<ReserveOutcome, StoreError>;

    /// Atomically decrements `sold_count`, floored at zero.
    async fn release(&self, ticket_type_id: Uuid) -> Result<ReleaseOutcome, StoreError>;

    // -- registrations ---------------------------------------------------

    /// Fails with [`StoreError::DuplicateActiveRegistration`] when the user
    /// already holds an active registration for the ticket type.
    async fn insert_registration(&self, registration: &Registration) -> Result<(), StoreError>;
    async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError>;
    async fn find_active_registration(
        &self,
        user_id: Uuid,
        ticket_type_id: Uuid,
    ) -> Result<Option<Registration>, StoreError>;
    /// Compare-and-set on the registration status. Returns `false` when no
    /// row with this id currently has status `from`; a lost race is not an
    /// error.
    async fn transition_registration(
        &self,
        id: Uuid,
        from: RegistrationStatus,
        to: RegistrationStatus,
    ) -> Result<bool, StoreError>;
    /// The next waitlisted registration in FIFO order for a ticket type.
    async fn oldest_waitlisted(
        &self,
        ticket_type_id: Uuid,
    ) -> Result<Option<Registration>, StoreError>;

    // -- read projections ------------------------------------------------

    async fn list_user_registrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserRegistrationRow>, StoreError>;
    async fn registration_roll(&self) -> Result<Vec<RollEntry>, StoreError>;
    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError>;
}
