//! Wire types exchanged between the server and outline clients.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// COURSE STRUCTURE
// =============================================================================

/// Authoritative structure of one course as read from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStructure {
    pub id: Uuid,
    pub title: String,
    pub chapters: Vec<ChapterData>,
}

/// A chapter with its lessons. `position` is 1-based within the course.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterData {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub lessons: Vec<LessonData>,
}

/// A lesson summary. `position` is 1-based within its chapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonData {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
}

// =============================================================================
// COMMIT PAYLOAD
// =============================================================================

/// One entry of a reorder commit: the entity and its new rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub position: i32,
}

/// Assign dense positions `1..=N` to `ids` in iteration order.
#[must_use]
pub fn dense_positions<I>(ids: I) -> Vec<PositionUpdate>
where
    I: IntoIterator<Item = Uuid>,
{
    ids.into_iter()
        .zip(1..)
        .map(|(id, position)| PositionUpdate { id, position })
        .collect()
}

// =============================================================================
// RESULT ENVELOPE
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

/// Uniform result of every structural operation. Failures are values, not
/// transport errors, so the caller can always show `message`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: ApiStatus,
    pub message: String,
}

impl ApiResponse {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Success, message: message.into() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Error, message: message.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ApiStatus::Success
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
