mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{
    event_starting_at, free_ticket, seed_event, seed_profile, sold_count, test_app, upcoming_event,
};
use rally_server::models::{AppRole, EventStatus, RegistrationStatus};
use rally_server::service::{EventUpdate, NewVenue, RegisterRequest, ServiceError};
use rally_server::store::TicketPoolStore;

fn request(user_id: Uuid, event_id: Uuid, ticket_type_id: Uuid) -> RegisterRequest {
    RegisterRequest {
        user_id,
        event_id,
        ticket_type_id,
        idempotency_key: None,
    }
}

#[tokio::test]
async fn register_confirms_and_counts() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(10), false).await;
    let user = Uuid::new_v4();

    let registration = app
        .registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap();

    assert_eq!(registration.status, RegistrationStatus::Confirmed);
    assert_eq!(registration.user_id, user);
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(10), false).await;
    let user = Uuid::new_v4();

    app.registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap();
    let err = app
        .registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::DuplicateRegistration));
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn started_event_rejects_registration() {
    let app = test_app();
    let organizer = Uuid::new_v4();
    let started = event_starting_at(Utc::now() - Duration::hours(1), vec![free_ticket(None, false)]);
    let (event, ticket_types) = app.catalog.create_event(organizer, started).await.unwrap();

    let err = app
        .registrations
        .register(request(Uuid::new_v4(), event.id, ticket_types[0].id))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::EventNotOpen));
}

#[tokio::test]
async fn cancelled_event_rejects_registration() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, None, false).await;
    let event = app.store.get_event(event_id).await.unwrap().unwrap();

    app.catalog
        .update_event(
            event_id,
            EventUpdate {
                title: event.title,
                description: event.description,
                start_ts: event.start_ts,
                end_ts: event.end_ts,
                capacity: event.capacity,
                status: EventStatus::Cancelled,
            },
        )
        .await
        .unwrap();

    let err = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::EventNotOpen));
}

#[tokio::test]
async fn capacity_exceeded_without_waitlist() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(1), false).await;

    app.registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    let err = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::CapacityExceeded));
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn sold_out_with_waitlist_lands_on_waitlist() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(1), true).await;

    let first = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    let second = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();

    assert_eq!(first.status, RegistrationStatus::Confirmed);
    assert_eq!(second.status, RegistrationStatus::Waitlist);
    // Waitlisted registrations claim no capacity.
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn cancel_releases_and_reregister_succeeds() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(1), false).await;
    let user = Uuid::new_v4();

    let registration = app
        .registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap();
    assert_eq!(sold_count(&app, tt_id).await, 1);

    app.registrations.cancel(registration.id).await.unwrap();
    assert_eq!(sold_count(&app, tt_id).await, 0);

    // Duplicate guard is cleared and capacity is back.
    let again = app
        .registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap();
    assert_eq!(again.status, RegistrationStatus::Confirmed);
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(5), false).await;

    let registration = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();

    app.registrations.cancel(registration.id).await.unwrap();
    let second = app.registrations.cancel(registration.id).await.unwrap();

    assert_eq!(second.status, RegistrationStatus::Cancelled);
    // Exactly one release.
    assert_eq!(sold_count(&app, tt_id).await, 0);
}

#[tokio::test]
async fn cancelling_a_waitlisted_registration_releases_nothing() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(1), true).await;

    app.registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    let waitlisted = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    assert_eq!(waitlisted.status, RegistrationStatus::Waitlist);

    let cancelled = app.registrations.cancel(waitlisted.id).await.unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn waitlist_promotion_is_fifo() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(1), true).await;

    let holder = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    let first_in_line = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    let second_in_line = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    assert_eq!(first_in_line.status, RegistrationStatus::Waitlist);
    assert_eq!(second_in_line.status, RegistrationStatus::Waitlist);

    app.registrations.cancel(holder.id).await.unwrap();

    let promoted = app
        .store
        .get_registration(first_in_line.id)
        .await
        .unwrap()
        .unwrap();
    let still_waiting = app
        .store
        .get_registration(second_in_line.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promoted.status, RegistrationStatus::Confirmed);
    assert_eq!(still_waiting.status, RegistrationStatus::Waitlist);
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn cancelled_waitlist_candidate_is_skipped_on_promotion() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(1), true).await;

    let holder = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    let first_in_line = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    let second_in_line = app
        .registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();

    // First in line walks away before a slot opens.
    app.registrations.cancel(first_in_line.id).await.unwrap();
    app.registrations.cancel(holder.id).await.unwrap();

    let promoted = app
        .store
        .get_registration(second_in_line.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promoted.status, RegistrationStatus::Confirmed);
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn idempotency_key_replays_original_outcome() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(5), false).await;
    let user = Uuid::new_v4();
    let key = Uuid::new_v4();

    let first = app
        .registrations
        .register(RegisterRequest {
            user_id: user,
            event_id,
            ticket_type_id: tt_id,
            idempotency_key: Some(key),
        })
        .await
        .unwrap();
    let replay = app
        .registrations
        .register(RegisterRequest {
            user_id: user,
            event_id,
            ticket_type_id: tt_id,
            idempotency_key: Some(key),
        })
        .await
        .unwrap();

    assert_eq!(first.id, key);
    assert_eq!(replay.id, first.id);
    assert_eq!(sold_count(&app, tt_id).await, 1);
}

#[tokio::test]
async fn ticket_type_must_belong_to_event() {
    let app = test_app();
    let (event_a, _tt_a) = seed_event(&app, None, false).await;
    let (_event_b, tt_b) = seed_event(&app, None, false).await;

    let err = app
        .registrations
        .register(request(Uuid::new_v4(), event_a, tt_b))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn open_events_report_remaining_capacity() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, Some(5), false).await;

    app.registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();
    app.registrations
        .register(request(Uuid::new_v4(), event_id, tt_id))
        .await
        .unwrap();

    let events = app.queries.open_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ticket_types.len(), 1);
    assert_eq!(events[0].ticket_types[0].remaining, Some(3));
}

#[tokio::test]
async fn started_events_drop_out_of_open_listing() {
    let app = test_app();
    let organizer = Uuid::new_v4();
    let started = event_starting_at(Utc::now() - Duration::hours(1), vec![free_ticket(None, false)]);
    app.catalog.create_event(organizer, started).await.unwrap();
    seed_event(&app, None, false).await;

    let events = app.queries.open_events().await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn registration_history_and_roll_are_newest_first() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, None, false).await;
    let user = seed_profile(&app, AppRole::Participant, "dana@example.com").await;

    let first = app
        .registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap();
    app.registrations.cancel(first.id).await.unwrap();
    let second = app
        .registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap();

    let history = app.queries.user_registrations(user).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[0].event_title, "Team offsite");
    assert_eq!(history[0].venue_label.as_deref(), Some("HQ rooftop"));

    let roll = app.queries.registration_roll().await.unwrap();
    assert_eq!(roll.len(), 2);
    assert_eq!(roll[0].participant_email, "dana@example.com");
    assert_eq!(roll[0].participant_name.as_deref(), Some("dana"));
}

#[tokio::test]
async fn venue_delete_is_restricted_then_allowed() {
    let app = test_app();
    let venue = app
        .catalog
        .create_venue(NewVenue {
            name: "Main hall".to_string(),
            location: Some("Floor 2".to_string()),
            capacity: 120,
            description: None,
        })
        .await
        .unwrap();

    let organizer = Uuid::new_v4();
    let mut new_event = upcoming_event(vec![free_ticket(None, false)]);
    new_event.venue_id = Some(venue.id);
    let (event, _) = app.catalog.create_event(organizer, new_event).await.unwrap();

    let err = app.catalog.delete_venue(venue.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::VenueInUse));

    app.catalog.delete_event(event.id).await.unwrap();
    app.catalog.delete_venue(venue.id).await.unwrap();
}

#[tokio::test]
async fn event_delete_cascades_to_registrations() {
    let app = test_app();
    let (event_id, tt_id) = seed_event(&app, None, false).await;
    let user = Uuid::new_v4();
    let registration = app
        .registrations
        .register(request(user, event_id, tt_id))
        .await
        .unwrap();

    app.catalog.delete_event(event_id).await.unwrap();

    assert!(app
        .store
        .get_registration(registration.id)
        .await
        .unwrap()
        .is_none());
    assert!(app.store.get_ticket_type(tt_id).await.unwrap().is_none());

    let stats = app.queries.dashboard_stats().await.unwrap();
    assert_eq!(stats.events, 0);
    assert_eq!(stats.registrations, 0);
}

#[tokio::test]
async fn event_creation_validates_times_and_defaults_a_ticket() {
    let app = test_app();
    let organizer = Uuid::new_v4();

    let mut backwards = upcoming_event(vec![]);
    backwards.end_ts = backwards.start_ts - Duration::hours(1);
    let err = app
        .catalog
        .create_event(organizer, backwards)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let (_, ticket_types) = app
        .catalog
        .create_event(organizer, upcoming_event(vec![]))
        .await
        .unwrap();
    assert_eq!(ticket_types.len(), 1);
    assert_eq!(ticket_types[0].name, "Standard");
}
