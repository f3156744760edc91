//! Course structure routes: tree data, reorder, create and delete for
//! chapters and lessons.
//!
//! Every mutation answers with an `ApiResponse` body; the HTTP status
//! mirrors the error class so non-browser clients can branch on it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use outline::{ApiResponse, CourseStructure, PositionUpdate};
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::services::course::LessonInput;
use crate::services::store::NewLesson;
use crate::services::structure::{self, StructureError};
use crate::state::AppState;

type Reply = (StatusCode, Json<ApiResponse>);

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
    pub items: Vec<PositionUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChapterBody {
    pub title: String,
}

pub(crate) fn structure_error_to_status(err: &StructureError) -> StatusCode {
    match err {
        StructureError::Forbidden(_) => StatusCode::FORBIDDEN,
        StructureError::EmptyInput(_)
        | StructureError::InvalidIds(_)
        | StructureError::InvalidPositions
        | StructureError::MissingTitle => StatusCode::BAD_REQUEST,
        StructureError::NotFound(_) => StatusCode::NOT_FOUND,
        StructureError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply(success: StatusCode, result: Result<ApiResponse, StructureError>) -> Reply {
    match result {
        Ok(response) => (success, Json(response)),
        Err(err) => (structure_error_to_status(&err), Json(ApiResponse::from(err))),
    }
}

/// `GET /api/admin/courses/:id/structure`: cached chapter/lesson tree.
pub async fn get_structure(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseStructure>, StatusCode> {
    auth.require_admin()?;

    state
        .views
        .get_or_load(course_id, state.store.as_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %course_id, "structure load failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `PUT /api/admin/courses/:id/chapters/order`
pub async fn reorder_chapters(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(body): Json<ReorderBody>,
) -> Reply {
    reply(StatusCode::OK, structure::reorder_chapters(&state, &auth.user, course_id, &body.items).await)
}

/// `PUT /api/admin/courses/:id/chapters/:chapter_id/lessons/order`
pub async fn reorder_lessons(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<ReorderBody>,
) -> Reply {
    reply(
        StatusCode::OK,
        structure::reorder_lessons(&state, &auth.user, chapter_id, &body.items, course_id).await,
    )
}

/// `POST /api/admin/courses/:id/chapters`
pub async fn create_chapter(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<Uuid>,
    Json(body): Json<CreateChapterBody>,
) -> Reply {
    reply(StatusCode::CREATED, structure::create_chapter(&state, &auth.user, course_id, &body.title).await)
}

/// `POST /api/admin/courses/:id/chapters/:chapter_id/lessons`
pub async fn create_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<LessonInput>,
) -> Reply {
    let lesson = NewLesson {
        title: body.title,
        description: body.description,
        thumbnail_key: body.thumbnail_key,
        video_key: body.video_key,
    };
    reply(StatusCode::CREATED, structure::create_lesson(&state, &auth.user, course_id, chapter_id, lesson).await)
}

/// `DELETE /api/admin/courses/:id/chapters/:chapter_id`
pub async fn delete_chapter(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, chapter_id)): Path<(Uuid, Uuid)>,
) -> Reply {
    reply(StatusCode::OK, structure::delete_chapter(&state, &auth.user, chapter_id, course_id).await)
}

/// `DELETE /api/admin/courses/:id/chapters/:chapter_id/lessons/:lesson_id`
pub async fn delete_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((course_id, chapter_id, lesson_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Reply {
    reply(
        StatusCode::OK,
        structure::delete_lesson(&state, &auth.user, chapter_id, lesson_id, course_id).await,
    )
}

#[cfg(test)]
#[path = "structure_test.rs"]
mod tests;
