// libs/doctor-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        // Directory
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/slots", get(handlers::get_available_slots))

        // Own profile and availability management
        .route("/me/profile", patch(handlers::update_my_profile))
        .route("/me/schedule", get(handlers::get_my_schedule))
        .route("/me/schedule/{day_of_week}", put(handlers::upsert_schedule_day))
        .route("/me/blocks", get(handlers::list_my_blocks))
        .route("/me/blocks", post(handlers::add_block))
        .route("/me/blocks/{block_id}", delete(handlers::delete_block))

        // Reviews
        .route("/{doctor_id}/reviews", post(handlers::add_review))
        .route("/{doctor_id}/reviews", get(handlers::list_doctor_reviews))
        .route("/reviews/{review_id}", patch(handlers::edit_review))
        .route("/reviews/{review_id}/approve", post(handlers::approve_review))
        .route("/me/reviews", get(handlers::my_reviews))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
