//! The HTTP boundary.

mod endpoints;
mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::types::AppState;

/// Creates the service router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(endpoints::get_health))
        .route("/registry/check", get(endpoints::get_registry_check))
        .route("/registry/platform", get(endpoints::get_registry_platform))
        .route("/courses", get(endpoints::get_courses))
        .route("/courses/draft", get(endpoints::get_course_draft))
        .route("/courses/send", post(endpoints::post_course_send))
        .route("/courses/send/:global_id", post(endpoints::post_course_update))
        .route("/courses/:global_id", get(endpoints::get_course))
        .route(
            "/courses/:global_id/enrollments",
            get(endpoints::get_course_enrollments),
        )
        .route("/events", post(endpoints::post_event))
        .with_state(state)
}
