//! Course service: validation, admin CRUD and the public catalog.
//!
//! DESIGN
//! ======
//! Courses are plain rows owned by the admin who created them; updates and
//! deletes are scoped to that owner. Level and status are typed on input
//! and stored as text guarded by `CHECK` constraints. The chapter/lesson
//! tree of a course is read through the structure store so the catalog and
//! the editor share one ordering.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use outline::CourseStructure;

use crate::services::store::{StoreError, StructureStore};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::Archived => "Archived",
        }
    }
}

pub const CATEGORIES: [&str; 10] = [
    "Development",
    "Business",
    "Finance",
    "IT & Software",
    "Office Productivity",
    "Design",
    "Health & Fitness",
    "Marketing",
    "Music",
    "Personal Development",
];

pub const MAX_DURATION_HOURS: i32 = 500;
pub const MAX_SMALL_DESCRIPTION: usize = 200;

/// Course form as submitted by the admin editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: String,
    pub description: String,
    pub file_key: String,
    pub price: i32,
    /// Hours.
    pub duration: i32,
    pub level: CourseLevel,
    pub category: String,
    pub small_description: String,
    pub slug: String,
    pub status: CourseStatus,
}

impl CourseInput {
    /// Check field constraints. Returns the first failing rule's message.
    ///
    /// # Errors
    ///
    /// Returns [`CourseError::Invalid`] naming the failed rule.
    pub fn validate(&self) -> Result<(), CourseError> {
        let small_len = self.small_description.chars().count();
        let rule = if self.title.trim().is_empty() {
            Some("Title is required")
        } else if self.description.chars().count() < 3 {
            Some("Description must be at least 3 characters long")
        } else if self.file_key.trim().is_empty() {
            Some("File key is required")
        } else if self.price < 1 {
            Some("Price must be at least 1")
        } else if self.duration < 1 {
            Some("Duration must be at least 1 hour")
        } else if self.duration > MAX_DURATION_HOURS {
            Some("Duration cannot exceed 500 hours")
        } else if !CATEGORIES.contains(&self.category.as_str()) {
            Some("Category is required")
        } else if small_len < 3 {
            Some("Small description must be at least 3 characters long")
        } else if small_len > MAX_SMALL_DESCRIPTION {
            Some("Small description cannot exceed 200 characters")
        } else if self.slug.chars().count() < 3 {
            Some("Slug must be at least 3 characters long")
        } else {
            None
        };

        match rule {
            Some(message) => Err(CourseError::Invalid(message)),
            None => Ok(()),
        }
    }
}

/// Lesson content edited from the lesson form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonInput {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_key: Option<String>,
    pub video_key: Option<String>,
}

/// Row returned from course queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub small_description: String,
    pub file_key: String,
    pub price: i32,
    pub duration: i32,
    pub level: String,
    pub category: String,
    pub slug: String,
    pub status: String,
}

/// Published course with its ordered chapters and lessons.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    pub course: CourseRow,
    pub structure: CourseStructure,
}

#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("course not found")]
    NotFound,
    #[error("Lesson not found")]
    LessonNotFound,
    #[error("slug already in use: {0}")]
    SlugTaken(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const COURSE_COLUMNS: &str =
    "id, title, description, small_description, file_key, price, duration, level, category, slug, status";

fn course_from_row(row: &PgRow) -> CourseRow {
    CourseRow {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        small_description: row.get("small_description"),
        file_key: row.get("file_key"),
        price: row.get("price"),
        duration: row.get("duration"),
        level: row.get("level"),
        category: row.get("category"),
        slug: row.get("slug"),
        status: row.get("status"),
    }
}

/// Map a unique violation on `slug` to [`CourseError::SlugTaken`].
fn slug_conflict(slug: &str) -> impl FnOnce(sqlx::Error) -> CourseError + '_ {
    move |err| {
        let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
        if unique { CourseError::SlugTaken(slug.to_owned()) } else { CourseError::Database(err) }
    }
}

// =============================================================================
// ADMIN CRUD
// =============================================================================

/// Create a course owned by `owner_id`.
///
/// # Errors
///
/// `Invalid` for rule violations, `SlugTaken` for a duplicate slug.
pub async fn create_course(pool: &PgPool, owner_id: Uuid, input: &CourseInput) -> Result<CourseRow, CourseError> {
    input.validate()?;

    let sql = format!(
        "INSERT INTO courses (user_id, title, description, small_description, file_key, price, duration, level, category, slug, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {COURSE_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(owner_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.small_description)
        .bind(&input.file_key)
        .bind(input.price)
        .bind(input.duration)
        .bind(input.level.as_str())
        .bind(&input.category)
        .bind(&input.slug)
        .bind(input.status.as_str())
        .fetch_one(pool)
        .await
        .map_err(slug_conflict(&input.slug))?;

    let course = course_from_row(&row);
    info!(course_id = %course.id, %owner_id, "course created");
    Ok(course)
}

/// Replace every editable field of a course owned by `owner_id`.
///
/// # Errors
///
/// `NotFound` when the course does not exist or belongs to someone else.
pub async fn update_course(
    pool: &PgPool,
    owner_id: Uuid,
    course_id: Uuid,
    input: &CourseInput,
) -> Result<CourseRow, CourseError> {
    input.validate()?;

    let sql = format!(
        "UPDATE courses
         SET title = $3, description = $4, small_description = $5, file_key = $6, price = $7,
             duration = $8, level = $9, category = $10, slug = $11, status = $12, updated_at = now()
         WHERE id = $1 AND user_id = $2
         RETURNING {COURSE_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(course_id)
        .bind(owner_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.small_description)
        .bind(&input.file_key)
        .bind(input.price)
        .bind(input.duration)
        .bind(input.level.as_str())
        .bind(&input.category)
        .bind(&input.slug)
        .bind(input.status.as_str())
        .fetch_optional(pool)
        .await
        .map_err(slug_conflict(&input.slug))?
        .ok_or(CourseError::NotFound)?;

    Ok(course_from_row(&row))
}

/// Delete a course owned by `owner_id`. Chapters and lessons cascade.
///
/// # Errors
///
/// `NotFound` when nothing was deleted.
pub async fn delete_course(pool: &PgPool, owner_id: Uuid, course_id: Uuid) -> Result<(), CourseError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1 AND user_id = $2")
        .bind(course_id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CourseError::NotFound);
    }
    info!(%course_id, %owner_id, "course deleted");
    Ok(())
}

/// Courses created by `owner_id`, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_own_courses(pool: &PgPool, owner_id: Uuid) -> Result<Vec<CourseRow>, CourseError> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE user_id = $1 ORDER BY created_at DESC");
    let rows = sqlx::query(&sql).bind(owner_id).fetch_all(pool).await?;
    Ok(rows.iter().map(course_from_row).collect())
}

/// Update the content fields of one lesson. Its position is untouched.
///
/// # Errors
///
/// `Invalid` for a blank title, `LessonNotFound` when the lesson is not in
/// the given chapter of the given course.
pub async fn update_lesson(
    pool: &PgPool,
    course_id: Uuid,
    chapter_id: Uuid,
    lesson_id: Uuid,
    input: &LessonInput,
) -> Result<(), CourseError> {
    if input.title.trim().is_empty() {
        return Err(CourseError::Invalid("Title is required"));
    }

    let result = sqlx::query(
        "UPDATE lessons AS l
         SET title = $4, description = $5, thumbnail_key = $6, video_key = $7, updated_at = now()
         FROM chapters AS c
         WHERE l.id = $1 AND l.chapter_id = $2 AND c.id = l.chapter_id AND c.course_id = $3",
    )
    .bind(lesson_id)
    .bind(chapter_id)
    .bind(course_id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(&input.thumbnail_key)
    .bind(&input.video_key)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CourseError::LessonNotFound);
    }
    Ok(())
}

// =============================================================================
// PUBLIC CATALOG
// =============================================================================

/// Published courses, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_published(pool: &PgPool) -> Result<Vec<CourseRow>, CourseError> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE status = 'Published' ORDER BY created_at DESC");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    Ok(rows.iter().map(course_from_row).collect())
}

/// A published course by slug, with its ordered chapters and lessons.
///
/// # Errors
///
/// `NotFound` for unknown or unpublished slugs.
pub async fn get_published_by_slug(
    pool: &PgPool,
    store: &dyn StructureStore,
    slug: &str,
) -> Result<CourseDetail, CourseError> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE slug = $1 AND status = 'Published'");
    let row = sqlx::query(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or(CourseError::NotFound)?;
    let course = course_from_row(&row);

    let structure = store.load_structure(course.id).await?.ok_or(CourseError::NotFound)?;
    Ok(CourseDetail { course, structure })
}

#[cfg(test)]
#[path = "course_test.rs"]
mod tests;
