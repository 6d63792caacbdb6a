pub mod account;
pub mod auth;
pub mod booking;
pub mod calendar;
pub mod catalog;
pub mod events;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/register", post(account::register))
        .route("/api/login", post(account::login))
        .route("/api/logout", post(account::logout))
        .route(
            "/api/account/:id",
            get(account::get_account).put(account::update_account),
        )
        .route(
            "/api/services",
            get(catalog::list_services).post(catalog::create_service),
        )
        .route(
            "/api/services/:id",
            put(catalog::update_service).delete(catalog::delete_service),
        )
        .route(
            "/api/employees",
            get(catalog::list_employees).post(catalog::create_employee),
        )
        .route(
            "/api/employees/:id",
            put(catalog::update_employee).delete(catalog::delete_employee),
        )
        .route(
            "/api/booking",
            get(booking::get_bookings).post(booking::create_booking),
        )
        .route("/api/booking/slots", get(booking::get_open_slots))
        .route("/api/booking/events", get(events::events_stream))
        .route(
            "/api/booking/:id",
            get(booking::get_booking)
                .put(booking::update_booking)
                .delete(booking::delete_booking),
        )
        .route("/api/booking/:id/ics", get(calendar::download_ics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
