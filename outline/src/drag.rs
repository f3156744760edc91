//! Pure drag-end reordering over the outline tree.
//!
//! DESIGN
//! ======
//! A drag-end is described by the dragged handle and the handle it was
//! dropped on. Each handle carries its scope metadata (chapter, or lesson
//! plus parent chapter). [`reorder`] turns `(tree, event)` into a new tree
//! without touching any state, so the caller decides when to apply it and
//! what to snapshot.
//!
//! Lessons only move inside their own chapter. Cross-chapter moves are
//! rejected here, before any commit is built.

use uuid::Uuid;

use crate::model::{PositionUpdate, dense_positions};
use crate::tree::ChapterNode;

// =============================================================================
// EVENT
// =============================================================================

/// Scope metadata attached to a sortable item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemScope {
    Chapter,
    Lesson { chapter_id: Uuid },
}

/// One end of a drag gesture. `scope` is `None` when the drop target did
/// not carry sortable metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragHandle {
    pub id: Uuid,
    pub scope: Option<ItemScope>,
}

impl DragHandle {
    #[must_use]
    pub fn chapter(id: Uuid) -> Self {
        Self { id, scope: Some(ItemScope::Chapter) }
    }

    #[must_use]
    pub fn lesson(id: Uuid, chapter_id: Uuid) -> Self {
        Self { id, scope: Some(ItemScope::Lesson { chapter_id }) }
    }
}

/// A completed drag gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragEvent {
    pub active: DragHandle,
    pub over: Option<DragHandle>,
}

// =============================================================================
// RESULT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Could not determine the chapter for reordering")]
    UndeterminedChapter,
    #[error("Could not find chapter old/new index for reordering")]
    ChapterIndexNotFound,
    #[error("Lesson move between different chapters is not allowed")]
    CrossChapterLesson,
    #[error("Could not find chapter for lesson")]
    ChapterNotFound,
    #[error("Could not find lesson for reordering")]
    LessonIndexNotFound,
}

/// Which ordering scope a successful move rewrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovedScope {
    Chapters,
    Lessons { chapter_id: Uuid },
}

/// New tree produced by a move, renumbered within the moved scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reordered {
    pub chapters: Vec<ChapterNode>,
    pub scope: MovedScope,
}

impl Reordered {
    /// Full position assignment for the moved scope, in display order.
    #[must_use]
    pub fn payload(&self) -> Vec<PositionUpdate> {
        match self.scope {
            MovedScope::Chapters => dense_positions(self.chapters.iter().map(|c| c.id)),
            MovedScope::Lessons { chapter_id } => self
                .chapters
                .iter()
                .find(|c| c.id == chapter_id)
                .map(|c| dense_positions(c.lessons.iter().map(|l| l.id)))
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// REORDER
// =============================================================================

/// Apply a drag-end event to `chapters`.
///
/// Returns `Ok(None)` for gestures that change nothing: no drop target,
/// dropping an item on itself, or pairing a lesson with a chapter handle.
///
/// # Errors
///
/// Returns a [`MoveError`] when the target cannot be resolved or a lesson
/// is dropped into a different chapter. The input tree is never modified.
pub fn reorder(chapters: &[ChapterNode], event: &DragEvent) -> Result<Option<Reordered>, MoveError> {
    let Some(over) = event.over else {
        return Ok(None);
    };
    if event.active.id == over.id {
        return Ok(None);
    }

    match (event.active.scope, over.scope) {
        (Some(ItemScope::Chapter), over_scope) => {
            let target = match over_scope {
                Some(ItemScope::Chapter) => over.id,
                Some(ItemScope::Lesson { chapter_id }) => chapter_id,
                None => return Err(MoveError::UndeterminedChapter),
            };
            move_chapter(chapters, event.active.id, target).map(Some)
        }
        (Some(ItemScope::Lesson { chapter_id }), Some(ItemScope::Lesson { chapter_id: over_chapter_id })) => {
            if chapter_id != over_chapter_id {
                return Err(MoveError::CrossChapterLesson);
            }
            move_lesson(chapters, chapter_id, event.active.id, over.id).map(Some)
        }
        _ => Ok(None),
    }
}

fn move_chapter(chapters: &[ChapterNode], active_id: Uuid, target_id: Uuid) -> Result<Reordered, MoveError> {
    let old_index = chapters.iter().position(|c| c.id == active_id);
    let new_index = chapters.iter().position(|c| c.id == target_id);
    let (Some(old_index), Some(new_index)) = (old_index, new_index) else {
        return Err(MoveError::ChapterIndexNotFound);
    };

    let mut next = chapters.to_vec();
    array_move(&mut next, old_index, new_index);
    for (chapter, position) in next.iter_mut().zip(1..) {
        chapter.position = position;
    }
    Ok(Reordered { chapters: next, scope: MovedScope::Chapters })
}

fn move_lesson(
    chapters: &[ChapterNode],
    chapter_id: Uuid,
    active_id: Uuid,
    over_id: Uuid,
) -> Result<Reordered, MoveError> {
    let chapter_index = chapters
        .iter()
        .position(|c| c.id == chapter_id)
        .ok_or(MoveError::ChapterNotFound)?;

    let lessons = &chapters[chapter_index].lessons;
    let old_index = lessons.iter().position(|l| l.id == active_id);
    let new_index = lessons.iter().position(|l| l.id == over_id);
    let (Some(old_index), Some(new_index)) = (old_index, new_index) else {
        return Err(MoveError::LessonIndexNotFound);
    };

    let mut next = chapters.to_vec();
    let lessons = &mut next[chapter_index].lessons;
    array_move(lessons, old_index, new_index);
    for (lesson, position) in lessons.iter_mut().zip(1..) {
        lesson.position = position;
    }
    Ok(Reordered { chapters: next, scope: MovedScope::Lessons { chapter_id } })
}

/// Move the element at `from` so it ends up at index `to`, shifting the
/// elements in between by one.
pub(crate) fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

#[cfg(test)]
#[path = "drag_test.rs"]
mod tests;
