pub mod availability;
pub mod bookings;
pub mod extract;
pub mod health;
pub mod notifications;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/providers/:id/availability",
            get(availability::get_availability)
                .post(availability::create_availability)
                .patch(availability::update_availability),
        )
        .route(
            "/api/providers/:id/availability/days-off",
            post(availability::add_day_off),
        )
        .route(
            "/api/providers/:id/availability/days-off/:date",
            delete(availability::remove_day_off),
        )
        .route("/api/providers/:id/slots", get(availability::get_slots))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/status", post(bookings::update_status))
        .route("/api/notifications/messages", post(notifications::new_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
