//! Postgres-backed ticket pool store.
//!
//! The capacity primitive is a single conditional `UPDATE`; the row lock
//! taken by Postgres linearizes concurrent reservations for the same ticket
//! type. The duplicate-registration guard is the partial unique index
//! `registrations_active_unique`, so a lost insert race surfaces as a typed
//! error instead of silent double booking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    DashboardStats, Event, EventStatus, Profile, Registration, RegistrationStatus, RollEntry,
    TicketType, UserRegistrationRow, Venue,
};

use super::{ReleaseOutcome, ReserveOutcome, StoreError, TicketPoolStore};

#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ticket_type_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM ticket_types WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx("ticket_type_exists", e))
    }
}

fn map_sqlx(context: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            if db.is_unique_violation() {
                StoreError::DuplicateActiveRegistration
            } else if db.is_foreign_key_violation() {
                StoreError::StillReferenced
            } else {
                StoreError::Internal(format!("{context}: {db}"))
            }
        }
        sqlx::Error::Io(io) => StoreError::Unavailable(format!("{context}: {io}")),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("{context}: connection pool exhausted"))
        }
        other => StoreError::Internal(format!("{context}: {other}")),
    }
}

#[async_trait]
impl TicketPoolStore for PgTicketStore {
    async fn insert_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO venues (id, name, location, capacity, description, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(venue.id)
        .bind(&venue.name)
        .bind(&venue.location)
        .bind(venue.capacity)
        .bind(&venue.description)
        .bind(venue.created_at)
        .bind(venue.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("insert_venue", e))?;
        Ok(())
    }

    async fn update_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE venues
             SET name = $2, location = $3, capacity = $4, description = $5, updated_at = $6
             WHERE id = $1",
        )
        .bind(venue.id)
        .bind(&venue.name)
        .bind(&venue.location)
        .bind(venue.capacity)
        .bind(&venue.description)
        .bind(venue.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("update_venue", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("venue"));
        }
        Ok(())
    }

    async fn delete_venue(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM venues WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("delete_venue", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("venue"));
        }
        Ok(())
    }

    async fn get_venue(&self, id: Uuid) -> Result<Option<Venue>, StoreError> {
        sqlx::query_as::<_, Venue>(
            "SELECT id, name, location, capacity, description, created_at, updated_at
             FROM venues WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_venue", e))
    }

    async fn list_venues(&self) -> Result<Vec<Venue>, StoreError> {
        sqlx::query_as::<_, Venue>(
            "SELECT id, name, location, capacity, description, created_at, updated_at
             FROM venues ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("list_venues", e))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (id, email, display_name, role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE
             SET email = EXCLUDED.email,
                 display_name = EXCLUDED.display_name,
                 role = EXCLUDED.role,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.role)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("upsert_profile", e))?;
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, role, created_at, updated_at
             FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_profile", e))
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, venue_id, venue_name,
                                 venue_location, start_ts, end_ts, timezone, recurrence_rule,
                                 capacity, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.venue_id)
        .bind(&event.venue_name)
        .bind(&event.venue_location)
        .bind(event.start_ts)
        .bind(event.end_ts)
        .bind(&event.timezone)
        .bind(&event.recurrence_rule)
        .bind(event.capacity)
        .bind(event.status)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("insert_event", e))?;
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE events
             SET title = $2, description = $3, venue_id = $4, venue_name = $5,
                 venue_location = $6, start_ts = $7, end_ts = $8, timezone = $9,
                 recurrence_rule = $10, capacity = $11, status = $12, updated_at = $13
             WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.venue_id)
        .bind(&event.venue_name)
        .bind(&event.venue_location)
        .bind(event.start_ts)
        .bind(event.end_ts)
        .bind(&event.timezone)
        .bind(&event.recurrence_rule)
        .bind(event.capacity)
        .bind(event.status)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("update_event", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("event"));
        }
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("delete_event", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("event"));
        }
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        sqlx::query_as::<_, Event>(
            "SELECT id, organizer_id, title, description, venue_id, venue_name, venue_location,
                    start_ts, end_ts, timezone, recurrence_rule, capacity, status,
                    created_at, updated_at
             FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_event", e))
    }

    async fn list_open_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>, StoreError> {
        sqlx::query_as::<_, Event>(
            "SELECT id, organizer_id, title, description, venue_id, venue_name, venue_location,
                    start_ts, end_ts, timezone, recurrence_rule, capacity, status,
                    created_at, updated_at
             FROM events
             WHERE status = $1 AND start_ts >= $2
             ORDER BY start_ts ASC",
        )
        .bind(EventStatus::Active)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("list_open_events", e))
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO ticket_types (id, event_id, name, description, kind, price, capacity,
                                       sold_count, waitlist_enabled, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(ticket_type.id)
        .bind(ticket_type.event_id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.kind)
        .bind(ticket_type.price)
        .bind(ticket_type.capacity)
        .bind(ticket_type.sold_count)
        .bind(ticket_type.waitlist_enabled)
        .bind(ticket_type.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("insert_ticket_type", e))?;
        Ok(())
    }

    async fn get_ticket_type(&self, id: Uuid) -> Result<Option<TicketType>, StoreError> {
        sqlx::query_as::<_, TicketType>(
            "SELECT id, event_id, name, description, kind, price, capacity, sold_count,
                    waitlist_enabled, created_at
             FROM ticket_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_ticket_type", e))
    }

    async fn list_ticket_types(&self, event_ids: &[Uuid]) -> Result<Vec<TicketType>, StoreError> {
        sqlx::query_as::<_, TicketType>(
            "SELECT id, event_id, name, description, kind, price, capacity, sold_count,
                    waitlist_enabled, created_at
             FROM ticket_types
             WHERE event_id = ANY($1)
             ORDER BY event_id, created_at ASC",
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("list_ticket_types", e))
    }

    async fn try_reserve(&self, ticket_type_id: Uuid) -> Result<ReserveOutcome, StoreError> {
        // Check and increment in one statement; the row lock serializes
        // concurrent callers so exactly one wins the last slot.
        let result = sqlx::query(
            "UPDATE ticket_types
             SET sold_count = sold_count + 1
             WHERE id = $1 AND (capacity IS NULL OR sold_count < capacity)",
        )
        .bind(ticket_type_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("try_reserve", e))?;

        if result.rows_affected() == 1 {
            return Ok(ReserveOutcome::Reserved);
        }
        if self.ticket_type_exists(ticket_type_id).await? {
            Ok(ReserveOutcome::CapacityExceeded)
        } else {
            Err(StoreError::NotFound("ticket type"))
        }
    }

    async fn release(&self, ticket_type_id: Uuid) -> Result<ReleaseOutcome, StoreError> {
        let result = sqlx::query(
            "UPDATE ticket_types
             SET sold_count = sold_count - 1
             WHERE id = $1 AND sold_count > 0",
        )
        .bind(ticket_type_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("release", e))?;

        if result.rows_affected() == 1 {
            return Ok(ReleaseOutcome::Released);
        }
        if self.ticket_type_exists(ticket_type_id).await? {
            Ok(ReleaseOutcome::AlreadyAtZero)
        } else {
            Err(StoreError::NotFound("ticket type"))
        }
    }

    async fn insert_registration(&self, registration: &Registration) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO registrations (id, user_id, event_id, ticket_type_id, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(registration.id)
        .bind(registration.user_id)
        .bind(registration.event_id)
        .bind(registration.ticket_type_id)
        .bind(registration.status)
        .bind(registration.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx("insert_registration", e))?;
        Ok(())
    }

    async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        sqlx::query_as::<_, Registration>(
            "SELECT id, user_id, event_id, ticket_type_id, status, created_at
             FROM registrations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("get_registration", e))
    }

    async fn find_active_registration(
        &self,
        user_id: Uuid,
        ticket_type_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        sqlx::query_as::<_, Registration>(
            "SELECT id, user_id, event_id, ticket_type_id, status, created_at
             FROM registrations
             WHERE user_id = $1 AND ticket_type_id = $2
               AND status IN ('confirmed', 'waitlist')
             LIMIT 1",
        )
        .bind(user_id)
        .bind(ticket_type_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("find_active_registration", e))
    }

    async fn transition_registration(
        &self,
        id: Uuid,
        from: RegistrationStatus,
        to: RegistrationStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE registrations SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx("transition_registration", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn oldest_waitlisted(
        &self,
        ticket_type_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        sqlx::query_as::<_, Registration>(
            "SELECT id, user_id, event_id, ticket_type_id, status, created_at
             FROM registrations
             WHERE ticket_type_id = $1 AND status = 'waitlist'
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
        )
        .bind(ticket_type_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx("oldest_waitlisted", e))
    }

    async fn list_user_registrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserRegistrationRow>, StoreError> {
        sqlx::query_as::<_, UserRegistrationRow>(
            "SELECT r.id, r.status, r.created_at,
                    e.id AS event_id, e.title AS event_title, e.start_ts AS event_start_ts,
                    COALESCE(v.name, e.venue_name) AS venue_label,
                    t.name AS ticket_name, t.kind AS ticket_kind
             FROM registrations r
             JOIN events e ON e.id = r.event_id
             JOIN ticket_types t ON t.id = r.ticket_type_id
             LEFT JOIN venues v ON v.id = e.venue_id
             WHERE r.user_id = $1
             ORDER BY r.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("list_user_registrations", e))
    }

    async fn registration_roll(&self) -> Result<Vec<RollEntry>, StoreError> {
        sqlx::query_as::<_, RollEntry>(
            "SELECT r.id, r.status, r.created_at,
                    p.display_name AS participant_name, p.email AS participant_email,
                    e.title AS event_title, e.start_ts AS event_start_ts,
                    t.name AS ticket_name, t.kind AS ticket_kind
             FROM registrations r
             JOIN profiles p ON p.id = r.user_id
             JOIN events e ON e.id = r.event_id
             JOIN ticket_types t ON t.id = r.ticket_type_id
             ORDER BY r.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("registration_roll", e))
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let events = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx("dashboard_stats", e))?;
        let venues = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM venues")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx("dashboard_stats", e))?;
        let registrations = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM registrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx("dashboard_stats", e))?;

        Ok(DashboardStats {
            events,
            venues,
            registrations,
        })
    }
}
