//! API endpoints for the admin catalog UI and the inbound event stream.
//!
//! Responses are JSON only; template rendering and access control live in
//! front of this service. Unavailable collaborators surface as 503
//! envelopes (the UI renders missing data), malformed course pages as 422.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::course::{self, get_course_info};
use crate::registry::{partners_by_id, CourseFilter, RegistryApi};
use crate::server::types::ApiErrorType;
use crate::sync::InboundEvent;
use crate::types::AppState;

/// GET /health
pub async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// GET /registry/check
///
/// Registry connectivity status, for the admin landing page.
pub async fn get_registry_check(State(s): State<Arc<AppState>>) -> Response {
    let status = s.registry.connection_check().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "partner_id": s.config.registry.partner_id,
        })),
    )
        .into_response()
}

/// GET /registry/platform
///
/// This platform's own entry in the registry's platform list.
pub async fn get_registry_platform(State(s): State<Arc<AppState>>) -> Response {
    let Some(platforms) = s.registry.platforms().await else {
        return registry_unavailable();
    };
    match partners_by_id(platforms).remove(&s.config.registry.partner_id) {
        Some(platform) => (StatusCode::OK, Json(platform)).into_response(),
        None => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "platform is not registered",
            Some(s.config.registry.partner_id.clone()),
        ))
        .into_response(),
    }
}

/// GET /courses
///
/// Registry course listing, each row enriched with its institution's short
/// title when the rightholder registry is reachable (partial data
/// otherwise).
pub async fn get_courses(
    State(s): State<Arc<AppState>>,
    Query(filter): Query<CourseFilter>,
) -> Response {
    info!("GET /courses");

    let Some(catalog) = s.registry.courses(&filter).await else {
        return registry_unavailable();
    };
    let rightholders = s.registry.rightholders().await.map(partners_by_id);

    let results: Vec<Value> = catalog
        .results
        .iter()
        .map(|course| {
            let short_title = rightholders
                .as_ref()
                .zip(course.institution_id.as_ref())
                .and_then(|(partners, id)| partners.get(id))
                .and_then(|partner| partner.short_title.clone());
            let mut row = serde_json::to_value(course).unwrap_or_default();
            if let Value::Object(fields) = &mut row {
                fields.insert("institution_short_title".to_string(), json!(short_title));
            }
            row
        })
        .collect();

    (StatusCode::OK, Json(json!({ "results": results }))).into_response()
}

/// Query parameters for the course draft endpoint.
#[derive(Debug, Deserialize)]
pub struct DraftQueryParams {
    /// Platform URL of the course to draft a record for.
    pub course_url: String,
}

/// GET /courses/draft?course_url=…
///
/// Builds the canonical record for a platform course: the JSON the registry
/// would receive plus the full nested mapping for form rendering.
pub async fn get_course_draft(
    State(s): State<Arc<AppState>>,
    Query(params): Query<DraftQueryParams>,
) -> Response {
    info!(course_url = %params.course_url, "GET /courses/draft");

    let Some(course_key) = course::course_key_from_url(&params.course_url) else {
        return ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "not a course URL",
            Some(params.course_url.clone()),
        ))
        .into_response();
    };

    match get_course_info(s.platform.as_ref(), &s.platform_base, &course_key).await {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(json!({
                "course_url": params.course_url,
                "course_json": record.to_json_value(),
                "course": record.to_map(),
            })),
        )
            .into_response(),
        Ok(None) => ApiErrorType::from((
            StatusCode::SERVICE_UNAVAILABLE,
            "course info unavailable",
            Some(course_key),
        ))
        .into_response(),
        Err(e) => {
            error!(course_key = %course_key, error = %e, "course page data is malformed");
            ApiErrorType::from((
                StatusCode::UNPROCESSABLE_ENTITY,
                "course page data is malformed",
                Some(e.to_string()),
            ))
            .into_response()
        }
    }
}

/// POST /courses/send
///
/// Publishes a new course record to the registry.
pub async fn post_course_send(
    State(s): State<Arc<AppState>>,
    Json(course): Json<Value>,
) -> Response {
    info!("POST /courses/send");
    match s.registry.create_course(course).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => registry_unavailable(),
    }
}

/// POST /courses/send/:global_id
///
/// Updates an existing registry course record.
pub async fn post_course_update(
    Path(global_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(course): Json<Value>,
) -> Response {
    info!(global_id = %global_id, "POST /courses/send");
    match s.registry.update_course(course, &global_id).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => registry_unavailable(),
    }
}

/// GET /courses/:global_id
pub async fn get_course(
    Path(global_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!(global_id = %global_id, "GET /courses");
    match s.registry.course(&global_id).await {
        Some(detail) => (StatusCode::OK, Json(detail)).into_response(),
        None => registry_unavailable(),
    }
}

/// GET /courses/:global_id/enrollments
///
/// Platform enrollments for the course behind a registry record, restricted
/// to users with a linked external identity.
pub async fn get_course_enrollments(
    Path(global_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!(global_id = %global_id, "GET /courses/enrollments");

    let Some(detail) = s.registry.course(&global_id).await else {
        return registry_unavailable();
    };
    let course_key = detail
        .external_url
        .as_deref()
        .and_then(course::course_key_from_url);
    let Some(course_key) = course_key else {
        return ApiErrorType::from((
            StatusCode::BAD_GATEWAY,
            "registry record has no usable course URL",
            detail.external_url,
        ))
        .into_response();
    };

    match s.platform.course_enrollments(&course_key).await {
        Some(enrollments) => (
            StatusCode::OK,
            Json(json!({
                "global_id": global_id,
                "course_id": course_key,
                "enrollments": enrollments,
            })),
        )
            .into_response(),
        None => ApiErrorType::from((
            StatusCode::SERVICE_UNAVAILABLE,
            "enrollment store unavailable",
            None,
        ))
        .into_response(),
    }
}

/// POST /events
///
/// Inbound lifecycle event. Always `202 Accepted`: dispatch is
/// fire-and-forget and the event source never learns of queue failures.
pub async fn post_event(
    State(s): State<Arc<AppState>>,
    Json(event): Json<InboundEvent>,
) -> Response {
    s.dispatcher.dispatch(event);
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response()
}

fn registry_unavailable() -> Response {
    ApiErrorType::from((StatusCode::SERVICE_UNAVAILABLE, "registry unavailable")).into_response()
}
