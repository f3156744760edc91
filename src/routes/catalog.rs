//! Public catalog routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use outline::CourseStructure;
use serde::Serialize;

use crate::config::AppConfig;
use crate::routes::courses::course_error_to_status;
use crate::services::course::{self, CourseRow};
use crate::state::AppState;

/// Catalog entry with a resolved cover image URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCourse {
    #[serde(flatten)]
    pub course: CourseRow,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDetail {
    #[serde(flatten)]
    pub course: CatalogCourse,
    pub structure: CourseStructure,
}

pub(crate) fn to_catalog(config: &AppConfig, course: CourseRow) -> CatalogCourse {
    let image_url = config.media_url(&course.file_key);
    CatalogCourse { course, image_url }
}

fn log_failure(err: course::CourseError) -> StatusCode {
    let status = course_error_to_status(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "catalog query failed");
    }
    status
}

/// `GET /api/courses`: published courses.
pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<CatalogCourse>>, StatusCode> {
    let rows = course::list_published(&state.pool).await.map_err(log_failure)?;
    Ok(Json(rows.into_iter().map(|row| to_catalog(&state.config, row)).collect()))
}

/// `GET /api/courses/:slug`: published course with chapters and lessons.
pub async fn get_course(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CatalogDetail>, StatusCode> {
    let detail = course::get_published_by_slug(&state.pool, state.store.as_ref(), &slug)
        .await
        .map_err(log_failure)?;

    Ok(Json(CatalogDetail { course: to_catalog(&state.config, detail.course), structure: detail.structure }))
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
