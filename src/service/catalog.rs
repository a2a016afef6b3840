//! Organizer-facing catalog operations: venues, events, ticket types.
//!
//! Deletion policies are deliberate: venues are restricted while events
//! reference them; deleting an event cascades to its ticket types and
//! registrations, so the whole ticket pool disappears with it and no
//! compensating releases are owed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Event, EventStatus, TicketKind, TicketType, Venue};
use crate::store::{StoreError, TicketPoolStore};
use crate::utils::retry::with_retry;

use super::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct NewVenue {
    pub name: String,
    pub location: Option<String>,
    pub capacity: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueUpdate {
    pub name: String,
    pub location: Option<String>,
    pub capacity: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub venue_id: Option<Uuid>,
    pub venue_name: Option<String>,
    pub venue_location: Option<String>,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub timezone: Option<String>,
    pub recurrence_rule: Option<String>,
    pub capacity: Option<i32>,
    /// When empty, a default free `Standard` ticket type is created.
    #[serde(default)]
    pub ticket_types: Vec<NewTicketType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicketType {
    pub name: String,
    pub description: Option<String>,
    pub kind: TicketKind,
    pub price: Option<Decimal>,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub waitlist_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventUpdate {
    pub title: String,
    pub description: Option<String>,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub status: EventStatus,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn TicketPoolStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn TicketPoolStore>) -> Self {
        Self { store }
    }

    pub async fn create_venue(&self, new: NewVenue) -> Result<Venue, ServiceError> {
        if new.name.trim().is_empty() {
            return Err(ServiceError::Validation("venue name is required".to_string()));
        }
        if new.capacity <= 0 {
            return Err(ServiceError::Validation(
                "venue capacity must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let venue = Venue {
            id: Uuid::new_v4(),
            name: new.name,
            location: new.location,
            capacity: new.capacity,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_venue(&venue).await?;
        tracing::info!(venue_id = %venue.id, "venue created");
        Ok(venue)
    }

    pub async fn update_venue(&self, id: Uuid, update: VenueUpdate) -> Result<Venue, ServiceError> {
        if update.capacity <= 0 {
            return Err(ServiceError::Validation(
                "venue capacity must be positive".to_string(),
            ));
        }
        let mut venue = with_retry("get_venue", || self.store.get_venue(id))
            .await?
            .ok_or(ServiceError::NotFound("venue"))?;

        venue.name = update.name;
        venue.location = update.location;
        venue.capacity = update.capacity;
        venue.description = update.description;
        venue.updated_at = Utc::now();

        self.store.update_venue(&venue).await?;
        Ok(venue)
    }

    pub async fn delete_venue(&self, id: Uuid) -> Result<(), ServiceError> {
        match self.store.delete_venue(id).await {
            Ok(()) => {
                tracing::info!(venue_id = %id, "venue deleted");
                Ok(())
            }
            Err(StoreError::StillReferenced) => Err(ServiceError::VenueInUse),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn list_venues(&self) -> Result<Vec<Venue>, ServiceError> {
        Ok(with_retry("list_venues", || self.store.list_venues()).await?)
    }

    pub async fn create_event(
        &self,
        organizer_id: Uuid,
        new: NewEvent,
    ) -> Result<(Event, Vec<TicketType>), ServiceError> {
        if new.title.trim().is_empty() {
            return Err(ServiceError::Validation("event title is required".to_string()));
        }
        if new.end_ts <= new.start_ts {
            return Err(ServiceError::Validation(
                "end time must be after start time".to_string(),
            ));
        }
        if matches!(new.capacity, Some(capacity) if capacity <= 0) {
            return Err(ServiceError::Validation(
                "capacity override must be positive".to_string(),
            ));
        }
        if let Some(venue_id) = new.venue_id {
            with_retry("get_venue", || self.store.get_venue(venue_id))
                .await?
                .ok_or(ServiceError::NotFound("venue"))?;
        }

        let definitions = if new.ticket_types.is_empty() {
            vec![NewTicketType {
                name: "Standard".to_string(),
                description: None,
                kind: TicketKind::Free,
                price: None,
                capacity: None,
                waitlist_enabled: false,
            }]
        } else {
            new.ticket_types
        };
        // Reject the whole request before writing anything, so a bad ticket
        // definition cannot leave a half-created event behind.
        for definition in &definitions {
            validate_ticket_type(definition)?;
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: Some(organizer_id),
            title: new.title,
            description: new.description,
            venue_id: new.venue_id,
            venue_name: new.venue_name,
            venue_location: new.venue_location,
            start_ts: new.start_ts,
            end_ts: new.end_ts,
            timezone: new.timezone.unwrap_or_else(|| "UTC".to_string()),
            recurrence_rule: new.recurrence_rule,
            capacity: new.capacity,
            status: EventStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_event(&event).await?;

        let mut ticket_types = Vec::with_capacity(definitions.len());
        for definition in definitions {
            ticket_types.push(self.create_ticket_type(event.id, definition).await?);
        }

        tracing::info!(event_id = %event.id, %organizer_id, "event created");
        Ok((event, ticket_types))
    }

    pub async fn update_event(&self, id: Uuid, update: EventUpdate) -> Result<Event, ServiceError> {
        if update.end_ts <= update.start_ts {
            return Err(ServiceError::Validation(
                "end time must be after start time".to_string(),
            ));
        }
        let mut event = with_retry("get_event", || self.store.get_event(id))
            .await?
            .ok_or(ServiceError::NotFound("event"))?;

        event.title = update.title;
        event.description = update.description;
        event.start_ts = update.start_ts;
        event.end_ts = update.end_ts;
        event.capacity = update.capacity;
        event.status = update.status;
        event.updated_at = Utc::now();

        self.store.update_event(&event).await?;
        Ok(event)
    }

    pub async fn delete_event(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store.delete_event(id).await?;
        tracing::info!(event_id = %id, "event deleted with its ticket types and registrations");
        Ok(())
    }

    pub async fn create_ticket_type(
        &self,
        event_id: Uuid,
        new: NewTicketType,
    ) -> Result<TicketType, ServiceError> {
        validate_ticket_type(&new)?;

        with_retry("get_event", || self.store.get_event(event_id))
            .await?
            .ok_or(ServiceError::NotFound("event"))?;

        let ticket_type = TicketType {
            id: Uuid::new_v4(),
            event_id,
            name: new.name,
            description: new.description,
            kind: new.kind,
            price: new.price.unwrap_or(Decimal::ZERO),
            capacity: new.capacity,
            sold_count: 0,
            waitlist_enabled: new.waitlist_enabled,
            created_at: Utc::now(),
        };
        self.store.insert_ticket_type(&ticket_type).await?;
        Ok(ticket_type)
    }
}

fn validate_ticket_type(new: &NewTicketType) -> Result<(), ServiceError> {
    if new.name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "ticket type name is required".to_string(),
        ));
    }
    if matches!(new.capacity, Some(capacity) if capacity <= 0) {
        return Err(ServiceError::Validation(
            "ticket capacity must be positive".to_string(),
        ));
    }

    let price = new.price.unwrap_or(Decimal::ZERO);
    match new.kind {
        TicketKind::Free | TicketKind::Donation if !price.is_zero() => {
            Err(ServiceError::Validation(
                "free and donation tickets cannot carry a price".to_string(),
            ))
        }
        TicketKind::Paid if price <= Decimal::ZERO => Err(ServiceError::Validation(
            "paid tickets require a positive price".to_string(),
        )),
        _ => Ok(()),
    }
}
