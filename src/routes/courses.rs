//! Admin course routes: list, create, edit, delete, and lesson content edits.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use outline::ApiResponse;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::course::{self, CourseError, CourseInput, CourseRow, LessonInput};
use crate::state::AppState;
use crate::views::ViewCache;

type Failure = (StatusCode, Json<ApiResponse>);

pub(crate) fn course_error_to_status(err: &CourseError) -> StatusCode {
    match err {
        CourseError::Invalid(_) => StatusCode::BAD_REQUEST,
        CourseError::NotFound | CourseError::LessonNotFound => StatusCode::NOT_FOUND,
        CourseError::SlugTaken(_) => StatusCode::CONFLICT,
        CourseError::Store(_) | CourseError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error body for a failed course operation. Storage details are logged,
/// not returned.
pub(crate) fn course_failure(err: CourseError, action: &'static str) -> Failure {
    let status = course_error_to_status(&err);
    let message = match &err {
        CourseError::Invalid(rule) => (*rule).to_owned(),
        CourseError::NotFound => "Course not found".to_owned(),
        CourseError::LessonNotFound => "Lesson not found".to_owned(),
        CourseError::SlugTaken(_) => "Slug already in use".to_owned(),
        CourseError::Store(_) | CourseError::Database(_) => {
            tracing::error!(error = %err, action, "course operation failed");
            action.to_owned()
        }
    };
    (status, Json(ApiResponse::error(message)))
}

fn forbidden() -> Failure {
    (StatusCode::FORBIDDEN, Json(ApiResponse::error("Admin access required")))
}

/// `GET /api/admin/courses`: courses owned by the caller.
pub async fn list_courses(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<CourseRow>>, Failure> {
    auth.require_admin().map_err(|_| forbidden())?;
    course::list_own_courses(&state.pool, auth.user.id)
        .await
        .map(Json)
        .map_err(|e| course_failure(e, "Failed to list courses"))
}

/// `POST /api/admin/courses`
pub async fn create_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CourseInput>,
) -> Result<(StatusCode, Json<CourseRow>), Failure> {
    auth.require_admin().map_err(|_| forbidden())?;
    let row = course::create_course(&state.pool, auth.user.id, &body)
        .await
        .map_err(|e| course_failure(e, "Failed to create course"))?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/admin/courses/:id`
pub async fn update_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(body): Json<CourseInput>,
) -> Result<Json<CourseRow>, Failure> {
    auth.require_admin().map_err(|_| forbidden())?;
    let row = course::update_course(&state.pool, auth.user.id, course_id, &body)
        .await
        .map_err(|e| course_failure(e, "Failed to update course"))?;
    state.views.invalidate(&ViewCache::edit_path(course_id)).await;
    Ok(Json(row))
}

/// `DELETE /api/admin/courses/:id`
pub async fn delete_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse>, Failure> {
    auth.require_admin().map_err(|_| forbidden())?;
    course::delete_course(&state.pool, auth.user.id, course_id)
        .await
        .map_err(|e| course_failure(e, "Failed to delete course"))?;
    state.views.invalidate(&ViewCache::edit_path(course_id)).await;
    Ok(Json(ApiResponse::success("Course deleted successfully")))
}

/// `PATCH /api/admin/courses/:id/chapters/:chapter_id/lessons/:lesson_id`
pub async fn update_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, chapter_id, lesson_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<LessonInput>,
) -> Result<Json<ApiResponse>, Failure> {
    auth.require_admin().map_err(|_| forbidden())?;
    course::update_lesson(&state.pool, course_id, chapter_id, lesson_id, &body)
        .await
        .map_err(|e| course_failure(e, "Failed to update lesson"))?;
    state.views.invalidate(&ViewCache::edit_path(course_id)).await;
    Ok(Json(ApiResponse::success("Lesson updated successfully")))
}

#[cfg(test)]
#[path = "courses_test.rs"]
mod tests;
