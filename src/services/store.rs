//! Course structure persistence.
//!
//! DESIGN
//! ======
//! Chapters (per course) and lessons (per chapter) are two ordering scopes
//! with the same shape: a parent row, child rows, and a dense `position`.
//! [`Scope`] names one of them and the [`StructureStore`] trait exposes the
//! handful of reads and writes the ordering service needs. Each write is a
//! single transaction; the store transaction is the only concurrency
//! boundary, so there is no in-process locking.
//!
//! TRADE-OFFS
//! ==========
//! Postgres checks plain unique constraints row by row, even inside one
//! `UPDATE`. The `(parent, position)` constraints are therefore
//! `DEFERRABLE INITIALLY DEFERRED` and only enforced at commit, which lets
//! a permutation be written as one batched statement.

use std::collections::{HashMap, HashSet};

use outline::{ChapterData, CourseStructure, LessonData, PositionUpdate, dense_positions};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

/// One ordering scope, keyed by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Chapters { course_id: Uuid },
    Lessons { chapter_id: Uuid },
}

impl Scope {
    #[must_use]
    pub fn parent_id(self) -> Uuid {
        match self {
            Self::Chapters { course_id } => course_id,
            Self::Lessons { chapter_id } => chapter_id,
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::Chapters { .. } => "chapters",
            Self::Lessons { .. } => "lessons",
        }
    }

    fn parent_table(self) -> &'static str {
        match self {
            Self::Chapters { .. } => "courses",
            Self::Lessons { .. } => "chapters",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            Self::Chapters { .. } => "course_id",
            Self::Lessons { .. } => "chapter_id",
        }
    }
}

/// A child row's identity and rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sibling {
    pub id: Uuid,
    pub position: i32,
}

/// Content for a lesson appended to a chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLesson {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_key: Option<String>,
    pub video_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A batch did not match the rows under its parent; nothing was written.
    #[error("position batch touched {applied} of {expected} rows")]
    PartialBatch { expected: u64, applied: u64 },
    /// The batch ids no longer match the scope's children under the lock.
    #[error("scope children changed since the batch was validated")]
    SiblingsChanged,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TRAIT
// =============================================================================

/// Persistence collaborator for course structure.
#[async_trait::async_trait]
pub trait StructureStore: Send + Sync {
    /// Course with chapters and lessons ordered by position.
    async fn load_structure(&self, course_id: Uuid) -> Result<Option<CourseStructure>, StoreError>;

    /// Children of the scope's parent ordered by position, or `None` when
    /// the parent does not exist.
    async fn siblings(&self, scope: Scope) -> Result<Option<Vec<Sibling>>, StoreError>;

    /// Write every position in `updates` or none of them. Fails with
    /// `SiblingsChanged` unless `updates` names exactly the scope's children
    /// at write time.
    async fn commit_positions(&self, scope: Scope, updates: &[PositionUpdate]) -> Result<(), StoreError>;

    /// Delete `removed_id` and renumber the survivors `1..N-1` in their
    /// current order, atomically.
    async fn remove_and_renumber(&self, scope: Scope, removed_id: Uuid) -> Result<(), StoreError>;

    /// Append a chapter after the current last one. `None` if the course is missing.
    async fn append_chapter(&self, course_id: Uuid, title: &str) -> Result<Option<Sibling>, StoreError>;

    /// Append a lesson after the current last one. `None` if the chapter is missing.
    async fn append_lesson(&self, chapter_id: Uuid, lesson: &NewLesson) -> Result<Option<Sibling>, StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgStructureStore {
    pool: PgPool,
}

impl PgStructureStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lock the parent row so concurrent writers to the same scope queue up.
async fn lock_parent(tx: &mut Transaction<'_, Postgres>, scope: Scope) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", scope.parent_table());
    let row = sqlx::query_scalar::<_, Uuid>(&sql)
        .bind(scope.parent_id())
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

/// Child ids of the scope in position order, read inside `tx`.
async fn locked_children(tx: &mut Transaction<'_, Postgres>, scope: Scope) -> Result<Vec<Uuid>, sqlx::Error> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = $1 ORDER BY position ASC, created_at ASC",
        scope.table(),
        scope.parent_column(),
    );
    sqlx::query_scalar::<_, Uuid>(&sql).bind(scope.parent_id()).fetch_all(&mut **tx).await
}

async fn apply_positions(
    tx: &mut Transaction<'_, Postgres>,
    scope: Scope,
    updates: &[PositionUpdate],
) -> Result<(), StoreError> {
    if updates.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = updates.iter().map(|u| u.id).collect();
    let positions: Vec<i32> = updates.iter().map(|u| u.position).collect();
    let sql = format!(
        "UPDATE {table} AS t
         SET position = u.position, updated_at = now()
         FROM UNNEST($2::uuid[], $3::int4[]) AS u(id, position)
         WHERE t.id = u.id AND t.{parent} = $1",
        table = scope.table(),
        parent = scope.parent_column(),
    );
    let result = sqlx::query(&sql)
        .bind(scope.parent_id())
        .bind(&ids)
        .bind(&positions)
        .execute(&mut **tx)
        .await?;

    let expected = updates.len() as u64;
    if result.rows_affected() != expected {
        return Err(StoreError::PartialBatch { expected, applied: result.rows_affected() });
    }
    Ok(())
}

#[async_trait::async_trait]
impl StructureStore for PgStructureStore {
    async fn load_structure(&self, course_id: Uuid) -> Result<Option<CourseStructure>, StoreError> {
        let Some(title) = sqlx::query_scalar::<_, String>("SELECT title FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let chapter_rows = sqlx::query_as::<_, (Uuid, String, i32)>(
            "SELECT id, title, position FROM chapters WHERE course_id = $1 ORDER BY position ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let lesson_rows = sqlx::query_as::<_, (Uuid, Uuid, String, i32)>(
            "SELECT l.id, l.chapter_id, l.title, l.position
             FROM lessons l
             JOIN chapters c ON c.id = l.chapter_id
             WHERE c.course_id = $1
             ORDER BY l.chapter_id, l.position ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut lessons_by_chapter: HashMap<Uuid, Vec<LessonData>> = HashMap::new();
        for (id, chapter_id, title, position) in lesson_rows {
            lessons_by_chapter
                .entry(chapter_id)
                .or_default()
                .push(LessonData { id, title, position });
        }

        let chapters = chapter_rows
            .into_iter()
            .map(|(id, title, position)| ChapterData {
                id,
                title,
                position,
                lessons: lessons_by_chapter.remove(&id).unwrap_or_default(),
            })
            .collect();

        Ok(Some(CourseStructure { id: course_id, title, chapters }))
    }

    async fn siblings(&self, scope: Scope) -> Result<Option<Vec<Sibling>>, StoreError> {
        let exists_sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", scope.parent_table());
        let exists: bool = sqlx::query_scalar(&exists_sql)
            .bind(scope.parent_id())
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Ok(None);
        }

        let sql = format!(
            "SELECT id, position FROM {} WHERE {} = $1 ORDER BY position ASC, created_at ASC",
            scope.table(),
            scope.parent_column(),
        );
        let rows = sqlx::query_as::<_, (Uuid, i32)>(&sql)
            .bind(scope.parent_id())
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(rows.into_iter().map(|(id, position)| Sibling { id, position }).collect()))
    }

    async fn commit_positions(&self, scope: Scope, updates: &[PositionUpdate]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        if !lock_parent(&mut tx, scope).await? {
            let expected = updates.len() as u64;
            return Err(StoreError::PartialBatch { expected, applied: 0 });
        }

        let children: HashSet<Uuid> = locked_children(&mut tx, scope).await?.into_iter().collect();
        let batch: HashSet<Uuid> = updates.iter().map(|u| u.id).collect();
        if batch.len() != updates.len() || batch != children {
            return Err(StoreError::SiblingsChanged);
        }

        // Dropping `tx` on error rolls back.
        apply_positions(&mut tx, scope, updates).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn remove_and_renumber(&self, scope: Scope, removed_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        if !lock_parent(&mut tx, scope).await? {
            return Err(StoreError::PartialBatch { expected: 1, applied: 0 });
        }

        let sql = format!("DELETE FROM {} WHERE id = $1 AND {} = $2", scope.table(), scope.parent_column());
        let deleted = sqlx::query(&sql)
            .bind(removed_id)
            .bind(scope.parent_id())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted != 1 {
            return Err(StoreError::PartialBatch { expected: 1, applied: deleted });
        }

        let survivors = dense_positions(locked_children(&mut tx, scope).await?);
        apply_positions(&mut tx, scope, &survivors).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_chapter(&self, course_id: Uuid, title: &str) -> Result<Option<Sibling>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !lock_parent(&mut tx, Scope::Chapters { course_id }).await? {
            return Ok(None);
        }

        let (id, position) = sqlx::query_as::<_, (Uuid, i32)>(
            "INSERT INTO chapters (course_id, title, position)
             SELECT $1, $2, COALESCE(MAX(position), 0) + 1 FROM chapters WHERE course_id = $1
             RETURNING id, position",
        )
        .bind(course_id)
        .bind(title)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(Sibling { id, position }))
    }

    async fn append_lesson(&self, chapter_id: Uuid, lesson: &NewLesson) -> Result<Option<Sibling>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !lock_parent(&mut tx, Scope::Lessons { chapter_id }).await? {
            return Ok(None);
        }

        let (id, position) = sqlx::query_as::<_, (Uuid, i32)>(
            "INSERT INTO lessons (chapter_id, title, description, thumbnail_key, video_key, position)
             SELECT $1, $2, $3, $4, $5, COALESCE(MAX(position), 0) + 1 FROM lessons WHERE chapter_id = $1
             RETURNING id, position",
        )
        .bind(chapter_id)
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(&lesson.thumbnail_key)
        .bind(&lesson.video_key)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(Sibling { id, position }))
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
