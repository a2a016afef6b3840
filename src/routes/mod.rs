use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{self, events, registrations, venues};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/venues",
            get(venues::list_venues).post(venues::create_venue),
        )
        .route(
            "/api/venues/:id",
            put(venues::update_venue).delete(venues::delete_venue),
        )
        .route(
            "/api/events",
            get(events::list_open_events).post(events::create_event),
        )
        .route(
            "/api/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/api/events/:id/ticket-types", post(events::create_ticket_type))
        .route(
            "/api/registrations",
            get(registrations::registration_roll).post(registrations::register),
        )
        .route("/api/registrations/mine", get(registrations::my_registrations))
        .route("/api/registrations/:id/cancel", post(registrations::cancel))
        .route("/api/stats", get(events::dashboard_stats))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
