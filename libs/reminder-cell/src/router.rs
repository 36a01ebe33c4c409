// libs/reminder-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn reminder_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_reminder))
        .route("/{reminder_id}", delete(handlers::delete_reminder))
        .route("/appointments/{appointment_id}", get(handlers::list_appointment_reminders))
        .route("/run-due", post(handlers::run_due_reminders))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
