//! Read-side projections. Display-only views; nothing here gates a
//! capacity decision, so every read goes through the bounded-retry helper
//! and never touches the ledger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    DashboardStats, EventWithTickets, RollEntry, TicketAvailability, UserRegistrationRow,
};
use crate::store::TicketPoolStore;
use crate::utils::retry::with_retry;

use super::ServiceError;

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn TicketPoolStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn TicketPoolStore>) -> Self {
        Self { store }
    }

    /// Active, not-yet-started events ordered by start time, each with its
    /// ticket types and computed remaining capacity.
    pub async fn open_events(&self) -> Result<Vec<EventWithTickets>, ServiceError> {
        let now = Utc::now();
        let events = with_retry("list_open_events", || self.store.list_open_events(now)).await?;
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let ticket_types =
            with_retry("list_ticket_types", || self.store.list_ticket_types(&event_ids)).await?;

        let mut by_event: HashMap<Uuid, Vec<TicketAvailability>> = HashMap::new();
        for ticket_type in ticket_types {
            by_event
                .entry(ticket_type.event_id)
                .or_default()
                .push(ticket_type.into());
        }

        Ok(events
            .into_iter()
            .map(|event| {
                let ticket_types = by_event.remove(&event.id).unwrap_or_default();
                EventWithTickets {
                    event,
                    ticket_types,
                }
            })
            .collect())
    }

    pub async fn event_with_tickets(&self, id: Uuid) -> Result<EventWithTickets, ServiceError> {
        let event = with_retry("get_event", || self.store.get_event(id))
            .await?
            .ok_or(ServiceError::NotFound("event"))?;
        let ids = [id];
        let ticket_types =
            with_retry("list_ticket_types", || self.store.list_ticket_types(&ids)).await?;
        Ok(EventWithTickets {
            event,
            ticket_types: ticket_types.into_iter().map(Into::into).collect(),
        })
    }

    /// A participant's registration history, newest first.
    pub async fn user_registrations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<UserRegistrationRow>, ServiceError> {
        Ok(with_retry("list_user_registrations", || {
            self.store.list_user_registrations(user_id)
        })
        .await?)
    }

    /// Organizer-facing roll of every registration with participant
    /// identity, newest first.
    pub async fn registration_roll(&self) -> Result<Vec<RollEntry>, ServiceError> {
        Ok(with_retry("registration_roll", || self.store.registration_roll()).await?)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        Ok(with_retry("dashboard_stats", || self.store.dashboard_stats()).await?)
    }
}
