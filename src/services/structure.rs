//! Chapter and lesson ordering service.
//!
//! DESIGN
//! ======
//! Positions are dense `1..N` within a scope at all times after a successful
//! mutation. Reorders replace the whole assignment for one scope; deletes
//! drop one child and renumber the survivors in their existing relative
//! order; creates append at `max + 1`. Every mutation is one store
//! transaction.
//!
//! Validation runs in a fixed order and nothing is written unless all of it
//! passes:
//!
//! 1. the actor is an admin (before any store read)
//! 2. the list is non-empty
//! 3. the supplied ids are exactly the scope's children, no more, no fewer,
//!    no duplicates
//! 4. the positions are a permutation of `1..N`
//!
//! ERROR HANDLING
//! ==============
//! Operations return `Result<ApiResponse, StructureError>`. The error
//! converts into an error `ApiResponse` so callers always get a
//! `{status, message}` body; routes also map it to an HTTP status. Store
//! failures are logged here and surface only as a generic message.

use std::collections::HashSet;

use outline::{ApiResponse, PositionUpdate};
use tracing::{error, info};
use uuid::Uuid;

use crate::services::access::{AccessError, require_admin};
use crate::services::session::SessionUser;
use crate::services::store::{NewLesson, Scope, Sibling, StoreError};
use crate::state::AppState;
use crate::views::ViewCache;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Chapter,
    Lesson,
}

impl Entity {
    fn singular(self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Lesson => "lesson",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            Self::Chapter => "chapters",
            Self::Lesson => "lessons",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("Admin access required")]
    Forbidden(#[from] AccessError),
    #[error("No {} provided for reordering", .0.plural())]
    EmptyInput(Entity),
    #[error("Invalid {} IDs provided", .0.singular())]
    InvalidIds(Entity),
    #[error("Invalid positions provided")]
    InvalidPositions,
    #[error("Title is required")]
    MissingTitle,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{action}: {source}")]
    Storage {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl From<StructureError> for ApiResponse {
    fn from(err: StructureError) -> Self {
        match err {
            StructureError::Storage { action, .. } => ApiResponse::error(action),
            other => ApiResponse::error(other.to_string()),
        }
    }
}

/// Wrap a store failure with the user-facing action that failed, logging
/// the underlying cause.
fn storage(action: &'static str) -> impl FnOnce(StoreError) -> StructureError {
    move |source| {
        error!(error = %source, action, "structure store failure");
        StructureError::Storage { action, source }
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// The supplied ids must be exactly the scope's children.
fn check_ids(siblings: &[Sibling], items: &[PositionUpdate], entity: Entity) -> Result<(), StructureError> {
    let supplied: HashSet<Uuid> = items.iter().map(|u| u.id).collect();
    let existing: HashSet<Uuid> = siblings.iter().map(|s| s.id).collect();
    if supplied.len() != items.len() || supplied != existing {
        return Err(StructureError::InvalidIds(entity));
    }
    Ok(())
}

/// The positions must be `1..=N` in some order.
fn check_positions(items: &[PositionUpdate]) -> Result<(), StructureError> {
    let mut positions: Vec<i32> = items.iter().map(|u| u.position).collect();
    positions.sort_unstable();
    let dense = positions.iter().zip(1..).all(|(&position, expected)| position == expected);
    if !dense {
        return Err(StructureError::InvalidPositions);
    }
    Ok(())
}

/// Confirm `chapter_id` belongs to `course_id`.
async fn ensure_chapter_in_course(
    state: &AppState,
    course_id: Uuid,
    chapter_id: Uuid,
    action: &'static str,
) -> Result<(), StructureError> {
    let chapters = state
        .store
        .siblings(Scope::Chapters { course_id })
        .await
        .map_err(storage(action))?
        .ok_or(StructureError::NotFound("Course not found"))?;
    if !chapters.iter().any(|c| c.id == chapter_id) {
        return Err(StructureError::NotFound("Chapter not found in the course"));
    }
    Ok(())
}

async fn commit_order(
    state: &AppState,
    scope: Scope,
    entity: Entity,
    items: &[PositionUpdate],
    action: &'static str,
) -> Result<(), StructureError> {
    if items.is_empty() {
        return Err(StructureError::EmptyInput(entity));
    }

    let parent_missing = match entity {
        Entity::Chapter => "Course not found",
        Entity::Lesson => "Chapter not found",
    };
    let siblings = state
        .store
        .siblings(scope)
        .await
        .map_err(storage(action))?
        .ok_or(StructureError::NotFound(parent_missing))?;

    check_ids(&siblings, items, entity)?;
    check_positions(items)?;

    // A sibling created or removed since the read surfaces as an id mismatch.
    state.store.commit_positions(scope, items).await.map_err(|e| match e {
        StoreError::SiblingsChanged => StructureError::InvalidIds(entity),
        other => storage(action)(other),
    })
}

async fn invalidate_edit_view(state: &AppState, course_id: Uuid) {
    state.views.invalidate(&ViewCache::edit_path(course_id)).await;
}

// =============================================================================
// REORDER
// =============================================================================

/// Replace the chapter order of a course.
///
/// # Errors
///
/// See the module docs for the validation order. Store failures map to
/// `"Failed to reorder chapters"`.
pub async fn reorder_chapters(
    state: &AppState,
    actor: &SessionUser,
    course_id: Uuid,
    items: &[PositionUpdate],
) -> Result<ApiResponse, StructureError> {
    require_admin(actor)?;

    let scope = Scope::Chapters { course_id };
    commit_order(state, scope, Entity::Chapter, items, "Failed to reorder chapters").await?;
    invalidate_edit_view(state, course_id).await;

    info!(%course_id, count = items.len(), "chapters reordered");
    Ok(ApiResponse::success("Chapters reordered successfully"))
}

/// Replace the lesson order of one chapter.
///
/// # Errors
///
/// As [`reorder_chapters`]; additionally the chapter must belong to
/// `course_id`.
pub async fn reorder_lessons(
    state: &AppState,
    actor: &SessionUser,
    chapter_id: Uuid,
    items: &[PositionUpdate],
    course_id: Uuid,
) -> Result<ApiResponse, StructureError> {
    const ACTION: &str = "Failed to reorder lessons";
    require_admin(actor)?;

    if items.is_empty() {
        return Err(StructureError::EmptyInput(Entity::Lesson));
    }
    ensure_chapter_in_course(state, course_id, chapter_id, ACTION).await?;

    let scope = Scope::Lessons { chapter_id };
    commit_order(state, scope, Entity::Lesson, items, ACTION).await?;
    invalidate_edit_view(state, course_id).await;

    info!(%course_id, %chapter_id, count = items.len(), "lessons reordered");
    Ok(ApiResponse::success("Lessons reordered successfully"))
}

// =============================================================================
// DELETE
// =============================================================================

/// Remove `removed_id` from `scope`. The store renumbers the survivors
/// under its own lock.
async fn remove_closing_gap(
    state: &AppState,
    scope: Scope,
    removed_id: Uuid,
    action: &'static str,
) -> Result<(), StructureError> {
    state.store.remove_and_renumber(scope, removed_id).await.map_err(storage(action))
}

/// Delete a chapter (and its lessons) and close the gap it leaves.
///
/// # Errors
///
/// `NotFound` when the course or the chapter within it is missing.
pub async fn delete_chapter(
    state: &AppState,
    actor: &SessionUser,
    chapter_id: Uuid,
    course_id: Uuid,
) -> Result<ApiResponse, StructureError> {
    const ACTION: &str = "Failed to delete chapter";
    require_admin(actor)?;

    let scope = Scope::Chapters { course_id };
    let chapters = state
        .store
        .siblings(scope)
        .await
        .map_err(storage(ACTION))?
        .ok_or(StructureError::NotFound("Course not found"))?;
    if !chapters.iter().any(|c| c.id == chapter_id) {
        return Err(StructureError::NotFound("Chapter not found in the course"));
    }

    remove_closing_gap(state, scope, chapter_id, ACTION).await?;
    invalidate_edit_view(state, course_id).await;

    info!(%course_id, %chapter_id, "chapter deleted");
    Ok(ApiResponse::success("Chapter deleted successfully"))
}

/// Delete a lesson and close the gap it leaves in its chapter.
///
/// # Errors
///
/// `NotFound` when the chapter or the lesson within it is missing.
pub async fn delete_lesson(
    state: &AppState,
    actor: &SessionUser,
    chapter_id: Uuid,
    lesson_id: Uuid,
    course_id: Uuid,
) -> Result<ApiResponse, StructureError> {
    const ACTION: &str = "Failed to delete lesson";
    require_admin(actor)?;
    ensure_chapter_in_course(state, course_id, chapter_id, ACTION).await?;

    let scope = Scope::Lessons { chapter_id };
    let lessons = state
        .store
        .siblings(scope)
        .await
        .map_err(storage(ACTION))?
        .ok_or(StructureError::NotFound("Chapter not found"))?;
    if !lessons.iter().any(|l| l.id == lesson_id) {
        return Err(StructureError::NotFound("Lesson not found in the chapter"));
    }

    remove_closing_gap(state, scope, lesson_id, ACTION).await?;
    invalidate_edit_view(state, course_id).await;

    info!(%course_id, %chapter_id, %lesson_id, "lesson deleted");
    Ok(ApiResponse::success("Lesson deleted successfully"))
}

// =============================================================================
// CREATE
// =============================================================================

/// Append a chapter to the end of a course.
///
/// # Errors
///
/// `MissingTitle` for a blank title, `NotFound` for a missing course.
pub async fn create_chapter(
    state: &AppState,
    actor: &SessionUser,
    course_id: Uuid,
    title: &str,
) -> Result<ApiResponse, StructureError> {
    require_admin(actor)?;

    let title = title.trim();
    if title.is_empty() {
        return Err(StructureError::MissingTitle);
    }

    let created = state
        .store
        .append_chapter(course_id, title)
        .await
        .map_err(storage("Failed to create chapter"))?
        .ok_or(StructureError::NotFound("Course not found"))?;
    invalidate_edit_view(state, course_id).await;

    info!(%course_id, chapter_id = %created.id, position = created.position, "chapter created");
    Ok(ApiResponse::success("Chapter created successfully"))
}

/// Append a lesson to the end of a chapter.
///
/// # Errors
///
/// `MissingTitle` for a blank title, `NotFound` when the chapter is not
/// part of the course.
pub async fn create_lesson(
    state: &AppState,
    actor: &SessionUser,
    course_id: Uuid,
    chapter_id: Uuid,
    lesson: NewLesson,
) -> Result<ApiResponse, StructureError> {
    const ACTION: &str = "Failed to create lesson";
    require_admin(actor)?;

    let lesson = NewLesson { title: lesson.title.trim().to_owned(), ..lesson };
    if lesson.title.is_empty() {
        return Err(StructureError::MissingTitle);
    }
    ensure_chapter_in_course(state, course_id, chapter_id, ACTION).await?;

    let created = state
        .store
        .append_lesson(chapter_id, &lesson)
        .await
        .map_err(storage(ACTION))?
        .ok_or(StructureError::NotFound("Chapter not found"))?;
    invalidate_edit_view(state, course_id).await;

    info!(%course_id, %chapter_id, lesson_id = %created.id, position = created.position, "lesson created");
    Ok(ApiResponse::success("Lesson created successfully"))
}

#[cfg(test)]
#[path = "structure_test.rs"]
mod tests;
