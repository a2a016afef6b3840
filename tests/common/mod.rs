#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use rally_server::models::{AppRole, Profile, TicketKind};
use rally_server::service::{
    CatalogService, NewEvent, NewTicketType, QueryService, RegistrationService,
};
use rally_server::store::{InMemoryTicketStore, TicketPoolStore};

pub struct TestApp {
    pub store: Arc<dyn TicketPoolStore>,
    pub catalog: CatalogService,
    pub registrations: RegistrationService,
    pub queries: QueryService,
}

pub fn test_app() -> TestApp {
    let store: Arc<dyn TicketPoolStore> = Arc::new(InMemoryTicketStore::new());
    TestApp {
        catalog: CatalogService::new(store.clone()),
        registrations: RegistrationService::new(store.clone()),
        queries: QueryService::new(store.clone()),
        store,
    }
}

pub async fn seed_profile(app: &TestApp, role: AppRole, email: &str) -> Uuid {
    let now = Utc::now();
    let profile = Profile {
        id: Uuid::new_v4(),
        email: email.to_string(),
        display_name: Some(email.split('@').next().unwrap_or(email).to_string()),
        role,
        created_at: now,
        updated_at: now,
    };
    app.store.upsert_profile(&profile).await.unwrap();
    profile.id
}

pub fn upcoming_event(ticket_types: Vec<NewTicketType>) -> NewEvent {
    event_starting_at(Utc::now() + Duration::days(7), ticket_types)
}

pub fn event_starting_at(start_ts: DateTime<Utc>, ticket_types: Vec<NewTicketType>) -> NewEvent {
    NewEvent {
        title: "Team offsite".to_string(),
        description: None,
        venue_id: None,
        venue_name: Some("HQ rooftop".to_string()),
        venue_location: None,
        start_ts,
        end_ts: start_ts + Duration::hours(4),
        timezone: None,
        recurrence_rule: None,
        capacity: None,
        ticket_types,
    }
}

pub fn free_ticket(capacity: Option<i32>, waitlist_enabled: bool) -> NewTicketType {
    NewTicketType {
        name: "General".to_string(),
        description: None,
        kind: TicketKind::Free,
        price: None,
        capacity,
        waitlist_enabled,
    }
}

/// Creates an upcoming active event with one free ticket type and returns
/// (event id, ticket type id).
pub async fn seed_event(
    app: &TestApp,
    capacity: Option<i32>,
    waitlist_enabled: bool,
) -> (Uuid, Uuid) {
    let organizer = Uuid::new_v4();
    let (event, ticket_types) = app
        .catalog
        .create_event(
            organizer,
            upcoming_event(vec![free_ticket(capacity, waitlist_enabled)]),
        )
        .await
        .unwrap();
    (event.id, ticket_types[0].id)
}

pub async fn sold_count(app: &TestApp, ticket_type_id: Uuid) -> i32 {
    app.store
        .get_ticket_type(ticket_type_id)
        .await
        .unwrap()
        .unwrap()
        .sold_count
}
