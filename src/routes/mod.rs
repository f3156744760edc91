//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under a single Axum router: session
//! routes, the public catalog, and the admin course editor. Structural
//! editor routes nest under `/api/admin/courses/{id}/chapters`.

pub mod auth;
pub mod catalog;
pub mod courses;
pub mod structure;

use axum::Router;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::routing::{delete, get, patch, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::state::AppState;

/// CORS policy. A configured origin gets credentialed requests; otherwise
/// any origin is allowed without cookies.
pub(crate) fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = config
        .cors_allow_origin
        .as_deref()
        .and_then(|raw| match HeaderValue::from_str(raw) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = raw, "ignoring invalid CORS_ALLOW_ORIGIN");
                None
            }
        });

    match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    }
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/courses", get(catalog::list_courses))
        .route("/api/courses/{slug}", get(catalog::get_course))
        .route("/api/admin/courses", get(courses::list_courses).post(courses::create_course))
        .route(
            "/api/admin/courses/{id}",
            patch(courses::update_course).delete(courses::delete_course),
        )
        .route("/api/admin/courses/{id}/structure", get(structure::get_structure))
        .route("/api/admin/courses/{id}/chapters", post(structure::create_chapter))
        .route("/api/admin/courses/{id}/chapters/order", put(structure::reorder_chapters))
        .route(
            "/api/admin/courses/{id}/chapters/{chapter_id}",
            delete(structure::delete_chapter),
        )
        .route("/api/admin/courses/{id}/chapters/{chapter_id}/lessons", post(structure::create_lesson))
        .route(
            "/api/admin/courses/{id}/chapters/{chapter_id}/lessons/order",
            put(structure::reorder_lessons),
        )
        .route(
            "/api/admin/courses/{id}/chapters/{chapter_id}/lessons/{lesson_id}",
            patch(courses::update_lesson).delete(structure::delete_lesson),
        )
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
