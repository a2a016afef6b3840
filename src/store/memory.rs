//! In-memory ticket pool store.
//!
//! Every operation takes the single state mutex, so the whole store is
//! trivially linearizable; in particular the capacity check-and-increment is
//! atomic with respect to all other callers, which is the contract the
//! ledger needs. Used by the test suites and as a reference model for the
//! Postgres implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    DashboardStats, Event, EventStatus, Profile, Registration, RegistrationStatus, RollEntry,
    TicketType, UserRegistrationRow, Venue,
};

use super::{ReleaseOutcome, ReserveOutcome, StoreError, TicketPoolStore};

#[derive(Default)]
struct State {
    venues: HashMap<Uuid, Venue>,
    profiles: HashMap<Uuid, Profile>,
    events: HashMap<Uuid, Event>,
    ticket_types: HashMap<Uuid, TicketType>,
    registrations: HashMap<Uuid, Registration>,
    /// Insertion sequence per registration; breaks `created_at` ties so
    /// waitlist promotion stays strictly FIFO.
    arrival: HashMap<Uuid, u64>,
    next_seq: u64,
}

#[derive(Default)]
pub struct InMemoryTicketStore {
    inner: Mutex<State>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().expect("ticket store mutex poisoned")
    }
}

#[async_trait]
impl TicketPoolStore for InMemoryTicketStore {
    async fn insert_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        self.lock().venues.insert(venue.id, venue.clone());
        Ok(())
    }

    async fn update_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        let mut state = self.lock();
        match state.venues.get_mut(&venue.id) {
            Some(existing) => {
                *existing = venue.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("venue")),
        }
    }

    async fn delete_venue(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.venues.contains_key(&id) {
            return Err(StoreError::NotFound("venue"));
        }
        if state.events.values().any(|e| e.venue_id == Some(id)) {
            return Err(StoreError::StillReferenced);
        }
        state.venues.remove(&id);
        Ok(())
    }

    async fn get_venue(&self, id: Uuid) -> Result<Option<Venue>, StoreError> {
        Ok(self.lock().venues.get(&id).cloned())
    }

    async fn list_venues(&self) -> Result<Vec<Venue>, StoreError> {
        let mut venues: Vec<Venue> = self.lock().venues.values().cloned().collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(venues)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.lock().profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.lock().profiles.get(&id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.lock().events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut state = self.lock();
        match state.events.get_mut(&event.id) {
            Some(existing) => {
                *existing = event.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("event")),
        }
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.events.remove(&id).is_none() {
            return Err(StoreError::NotFound("event"));
        }
        // Cascade, mirroring the FK policy of the relational schema.
        state.ticket_types.retain(|_, t| t.event_id != id);
        let removed: Vec<Uuid> = state
            .registrations
            .values()
            .filter(|r| r.event_id == id)
            .map(|r| r.id)
            .collect();
        for reg_id in removed {
            state.registrations.remove(&reg_id);
            state.arrival.remove(&reg_id);
        }
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn list_open_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self
            .lock()
            .events
            .values()
            .filter(|e| e.status == EventStatus::Active && e.start_ts >= now)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_ts);
        Ok(events)
    }

    async fn insert_ticket_type(&self, ticket_type: &TicketType) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.events.contains_key(&ticket_type.event_id) {
            return Err(StoreError::NotFound("event"));
        }
        state
            .ticket_types
            .insert(ticket_type.id, ticket_type.clone());
        Ok(())
    }

    async fn get_ticket_type(&self, id: Uuid) -> Result<Option<TicketType>, StoreError> {
        Ok(self.lock().ticket_types.get(&id).cloned())
    }

    async fn list_ticket_types(&self, event_ids: &[Uuid]) -> Result<Vec<TicketType>, StoreError> {
        let mut ticket_types: Vec<TicketType> = self
            .lock()
            .ticket_types
            .values()
            .filter(|t| event_ids.contains(&t.event_id))
            .cloned()
            .collect();
        ticket_types.sort_by_key(|t| (t.event_id, t.created_at));
        Ok(ticket_types)
    }

    async fn try_reserve(&self, ticket_type_id: Uuid) -> Result<ReserveOutcome, StoreError> {
        let mut state = self.lock();
        let ticket_type = state
            .ticket_types
            .get_mut(&ticket_type_id)
            .ok_or(StoreError::NotFound("ticket type"))?;

        match ticket_type.capacity {
            Some(capacity) if ticket_type.sold_count >= capacity => {
                Ok(ReserveOutcome::CapacityExceeded)
            }
            _ => {
                ticket_type.sold_count += 1;
                Ok(ReserveOutcome::Reserved)
            }
        }
    }

    async fn release(&self, ticket_type_id: Uuid) -> Result<ReleaseOutcome, StoreError> {
        let mut state = self.lock();
        let ticket_type = state
            .ticket_types
            .get_mut(&ticket_type_id)
            .ok_or(StoreError::NotFound("ticket type"))?;

        if ticket_type.sold_count > 0 {
            ticket_type.sold_count -= 1;
            Ok(ReleaseOutcome::Released)
        } else {
            Ok(ReleaseOutcome::AlreadyAtZero)
        }
    }

    async fn insert_registration(&self, registration: &Registration) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.ticket_types.contains_key(&registration.ticket_type_id) {
            return Err(StoreError::NotFound("ticket type"));
        }
        let duplicate = state.registrations.values().any(|r| {
            r.user_id == registration.user_id
                && r.ticket_type_id == registration.ticket_type_id
                && r.is_active()
        });
        if duplicate && registration.is_active() {
            return Err(StoreError::DuplicateActiveRegistration);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.arrival.insert(registration.id, seq);
        state
            .registrations
            .insert(registration.id, registration.clone());
        Ok(())
    }

    async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        Ok(self.lock().registrations.get(&id).cloned())
    }

    async fn find_active_registration(
        &self,
        user_id: Uuid,
        ticket_type_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        Ok(self
            .lock()
            .registrations
            .values()
            .find(|r| r.user_id == user_id && r.ticket_type_id == ticket_type_id && r.is_active())
            .cloned())
    }

    async fn transition_registration(
        &self,
        id: Uuid,
        from: RegistrationStatus,
        to: RegistrationStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.registrations.get_mut(&id) {
            Some(registration) if registration.status == from => {
                registration.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn oldest_waitlisted(
        &self,
        ticket_type_id: Uuid,
    ) -> Result<Option<Registration>, StoreError> {
        let state = self.lock();
        Ok(state
            .registrations
            .values()
            .filter(|r| {
                r.ticket_type_id == ticket_type_id && r.status == RegistrationStatus::Waitlist
            })
            .min_by_key(|r| state.arrival.get(&r.id).copied().unwrap_or(u64::MAX))
            .cloned())
    }

    async fn list_user_registrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserRegistrationRow>, StoreError> {
        let state = self.lock();
        let mut rows: Vec<(u64, UserRegistrationRow)> = state
            .registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                let event = state.events.get(&r.event_id)?;
                let ticket_type = state.ticket_types.get(&r.ticket_type_id)?;
                let venue_label = event
                    .venue_id
                    .and_then(|vid| state.venues.get(&vid).map(|v| v.name.clone()))
                    .or_else(|| event.venue_name.clone());
                let seq = state.arrival.get(&r.id).copied().unwrap_or(0);
                Some((
                    seq,
                    UserRegistrationRow {
                        id: r.id,
                        status: r.status,
                        created_at: r.created_at,
                        event_id: event.id,
                        event_title: event.title.clone(),
                        event_start_ts: event.start_ts,
                        venue_label,
                        ticket_name: ticket_type.name.clone(),
                        ticket_kind: ticket_type.kind,
                    },
                ))
            })
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn registration_roll(&self) -> Result<Vec<RollEntry>, StoreError> {
        let state = self.lock();
        let mut rows: Vec<(u64, RollEntry)> = state
            .registrations
            .values()
            .filter_map(|r| {
                let profile = state.profiles.get(&r.user_id)?;
                let event = state.events.get(&r.event_id)?;
                let ticket_type = state.ticket_types.get(&r.ticket_type_id)?;
                let seq = state.arrival.get(&r.id).copied().unwrap_or(0);
                Some((
                    seq,
                    RollEntry {
                        id: r.id,
                        status: r.status,
                        created_at: r.created_at,
                        participant_name: profile.display_name.clone(),
                        participant_email: profile.email.clone(),
                        event_title: event.title.clone(),
                        event_start_ts: event.start_ts,
                        ticket_name: ticket_type.name.clone(),
                        ticket_kind: ticket_type.kind,
                    },
                ))
            })
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        let state = self.lock();
        Ok(DashboardStats {
            events: state.events.len() as i64,
            venues: state.venues.len() as i64,
            registrations: state.registrations.len() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn ticket_type(event_id: Uuid, capacity: Option<i32>) -> TicketType {
        TicketType {
            id: Uuid::new_v4(),
            event_id,
            name: "Standard".to_string(),
            description: None,
            kind: crate::models::TicketKind::Free,
            price: Decimal::ZERO,
            capacity,
            sold_count: 0,
            waitlist_enabled: false,
            created_at: Utc::now(),
        }
    }

    fn event() -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            organizer_id: None,
            title: "Launch day".to_string(),
            description: None,
            venue_id: None,
            venue_name: Some("HQ".to_string()),
            venue_location: None,
            start_ts: now + chrono::Duration::days(7),
            end_ts: now + chrono::Duration::days(7) + chrono::Duration::hours(2),
            timezone: "UTC".to_string(),
            recurrence_rule: None,
            capacity: None,
            status: EventStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn reserve_stops_at_capacity() {
        let store = InMemoryTicketStore::new();
        let ev = event();
        store.insert_event(&ev).await.unwrap();
        let tt = ticket_type(ev.id, Some(2));
        store.insert_ticket_type(&tt).await.unwrap();

        assert_eq!(store.try_reserve(tt.id).await.unwrap(), ReserveOutcome::Reserved);
        assert_eq!(store.try_reserve(tt.id).await.unwrap(), ReserveOutcome::Reserved);
        assert_eq!(
            store.try_reserve(tt.id).await.unwrap(),
            ReserveOutcome::CapacityExceeded
        );

        let stored = store.get_ticket_type(tt.id).await.unwrap().unwrap();
        assert_eq!(stored.sold_count, 2);
    }

    #[tokio::test]
    async fn unlimited_capacity_never_rejects() {
        let store = InMemoryTicketStore::new();
        let ev = event();
        store.insert_event(&ev).await.unwrap();
        let tt = ticket_type(ev.id, None);
        store.insert_ticket_type(&tt).await.unwrap();

        for _ in 0..100 {
            assert_eq!(store.try_reserve(tt.id).await.unwrap(), ReserveOutcome::Reserved);
        }
    }

    #[tokio::test]
    async fn release_is_floored_at_zero() {
        let store = InMemoryTicketStore::new();
        let ev = event();
        store.insert_event(&ev).await.unwrap();
        let tt = ticket_type(ev.id, Some(1));
        store.insert_ticket_type(&tt).await.unwrap();

        assert_eq!(
            store.release(tt.id).await.unwrap(),
            ReleaseOutcome::AlreadyAtZero
        );

        store.try_reserve(tt.id).await.unwrap();
        assert_eq!(store.release(tt.id).await.unwrap(), ReleaseOutcome::Released);
        assert_eq!(
            store.release(tt.id).await.unwrap(),
            ReleaseOutcome::AlreadyAtZero
        );
    }

    #[tokio::test]
    async fn venue_delete_is_restricted_while_referenced() {
        let store = InMemoryTicketStore::new();
        let now = Utc::now();
        let venue = Venue {
            id: Uuid::new_v4(),
            name: "Main hall".to_string(),
            location: None,
            capacity: 100,
            description: None,
            created_at: now,
            updated_at: now,
        };
        store.insert_venue(&venue).await.unwrap();

        let mut ev = event();
        ev.venue_id = Some(venue.id);
        store.insert_event(&ev).await.unwrap();

        assert!(matches!(
            store.delete_venue(venue.id).await,
            Err(StoreError::StillReferenced)
        ));

        store.delete_event(ev.id).await.unwrap();
        store.delete_venue(venue.id).await.unwrap();
    }
}
