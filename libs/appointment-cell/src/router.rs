// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        // Booking
        .route("/", post(handlers::create_appointment).get(handlers::list_appointments))
        .route("/request-reschedule", post(handlers::request_appointment))
        .route("/available-slots", get(handlers::get_available_slots))
        .route("/cancel-request", post(handlers::request_cancellation))

        // Reporting (admin)
        .route("/completed", get(handlers::get_completed_appointments))
        .route("/requested", get(handlers::get_requested_appointments))
        .route("/completed-counts/{window}", get(handlers::get_completed_count))
        .route("/daily-registrations", get(handlers::get_daily_registrations))
        .route("/weekly-registrations", get(handlers::get_weekly_registrations))
        .route("/monthly-registrations", get(handlers::get_monthly_registrations))

        // Single appointment
        .route("/{appointment_id}", get(handlers::get_appointment).put(handlers::update_appointment))
        .route("/{appointment_id}/status", put(handlers::update_appointment_status))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
