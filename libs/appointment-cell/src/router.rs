// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        // Booking and per-appointment operations
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/bulk-status", post(handlers::bulk_update_appointments))

        // Dashboards
        .route("/mine", get(handlers::get_my_appointments))
        .route("/doctor", get(handlers::get_doctor_appointments))

        // Search, export and analytics
        .route("/search", get(handlers::search_appointments))
        .route("/export", get(handlers::export_appointments))
        .route("/analytics", get(handlers::analytics_dashboard))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
