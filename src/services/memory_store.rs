//! In-memory [`StructureStore`] for tests.
//!
//! Enforces the same rules as the Postgres store: batches touch only rows
//! under the scope's parent, and a write that would leave duplicate
//! positions is rejected as a whole. `fail_writes` injects a storage
//! failure into every mutating call.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use outline::{ChapterData, CourseStructure, LessonData, PositionUpdate, dense_positions};
use uuid::Uuid;

use super::store::{NewLesson, Scope, Sibling, StoreError, StructureStore};

#[derive(Debug, Clone)]
struct Row {
    id: Uuid,
    parent: Uuid,
    title: String,
    position: i32,
}

#[derive(Default)]
struct Tables {
    courses: HashMap<Uuid, String>,
    chapters: Vec<Row>,
    lessons: Vec<Row>,
}

impl Tables {
    fn rows(&self, scope: Scope) -> &Vec<Row> {
        match scope {
            Scope::Chapters { .. } => &self.chapters,
            Scope::Lessons { .. } => &self.lessons,
        }
    }

    fn rows_mut(&mut self, scope: Scope) -> &mut Vec<Row> {
        match scope {
            Scope::Chapters { .. } => &mut self.chapters,
            Scope::Lessons { .. } => &mut self.lessons,
        }
    }

    fn parent_exists(&self, scope: Scope) -> bool {
        match scope {
            Scope::Chapters { course_id } => self.courses.contains_key(&course_id),
            Scope::Lessons { chapter_id } => self.chapters.iter().any(|c| c.id == chapter_id),
        }
    }

    fn next_position(&self, scope: Scope) -> i32 {
        let parent = scope.parent_id();
        self.rows(scope)
            .iter()
            .filter(|r| r.parent == parent)
            .map(|r| r.position)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[derive(Default)]
pub struct MemoryStructureStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStructureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().courses.insert(id, title.to_owned());
        id
    }

    /// Insert a chapter with an explicit position, bypassing validation.
    pub fn add_chapter(&self, course_id: Uuid, title: &str, position: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().chapters.push(Row { id, parent: course_id, title: title.to_owned(), position });
        id
    }

    /// Insert a lesson with an explicit position, bypassing validation.
    pub fn add_lesson(&self, chapter_id: Uuid, title: &str, position: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().lessons.push(Row { id, parent: chapter_id, title: title.to_owned(), position });
        id
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// `(title, position)` of every child in the scope, ordered by position.
    pub fn snapshot(&self, scope: Scope) -> Vec<(String, i32)> {
        let tables = self.tables.lock().unwrap();
        let parent = scope.parent_id();
        let mut rows: Vec<(String, i32)> = tables
            .rows(scope)
            .iter()
            .filter(|r| r.parent == parent)
            .map(|r| (r.title.clone(), r.position))
            .collect();
        rows.sort_by_key(|(_, position)| *position);
        rows
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

/// Apply `updates` to the rows under `parent`, all or nothing.
fn apply(rows: &mut [Row], parent: Uuid, updates: &[PositionUpdate]) -> Result<(), StoreError> {
    let expected = updates.len() as u64;
    let mut staged: Vec<Row> = rows.iter().filter(|r| r.parent == parent).cloned().collect();

    let mut applied = 0;
    for update in updates {
        if let Some(row) = staged.iter_mut().find(|r| r.id == update.id) {
            row.position = update.position;
            applied += 1;
        }
    }
    if applied != expected {
        return Err(StoreError::PartialBatch { expected, applied });
    }

    let mut positions: Vec<i32> = staged.iter().map(|r| r.position).collect();
    positions.sort_unstable();
    positions.dedup();
    if positions.len() != staged.len() {
        return Err(StoreError::PartialBatch { expected, applied: 0 });
    }

    for row in rows.iter_mut().filter(|r| r.parent == parent) {
        if let Some(update) = updates.iter().find(|u| u.id == row.id) {
            row.position = update.position;
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl StructureStore for MemoryStructureStore {
    async fn load_structure(&self, course_id: Uuid) -> Result<Option<CourseStructure>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        let Some(title) = tables.courses.get(&course_id) else {
            return Ok(None);
        };

        let mut chapters: Vec<ChapterData> = tables
            .chapters
            .iter()
            .filter(|c| c.parent == course_id)
            .map(|c| {
                let mut lessons: Vec<LessonData> = tables
                    .lessons
                    .iter()
                    .filter(|l| l.parent == c.id)
                    .map(|l| LessonData { id: l.id, title: l.title.clone(), position: l.position })
                    .collect();
                lessons.sort_by_key(|l| l.position);
                ChapterData { id: c.id, title: c.title.clone(), position: c.position, lessons }
            })
            .collect();
        chapters.sort_by_key(|c| c.position);

        Ok(Some(CourseStructure { id: course_id, title: title.clone(), chapters }))
    }

    async fn siblings(&self, scope: Scope) -> Result<Option<Vec<Sibling>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        if !tables.parent_exists(scope) {
            return Ok(None);
        }
        let parent = scope.parent_id();
        let mut siblings: Vec<Sibling> = tables
            .rows(scope)
            .iter()
            .filter(|r| r.parent == parent)
            .map(|r| Sibling { id: r.id, position: r.position })
            .collect();
        siblings.sort_by_key(|s| s.position);
        Ok(Some(siblings))
    }

    async fn commit_positions(&self, scope: Scope, updates: &[PositionUpdate]) -> Result<(), StoreError> {
        self.begin_write()?;
        let mut tables = self.tables.lock().unwrap();
        let parent = scope.parent_id();

        let children: HashSet<Uuid> = tables.rows(scope).iter().filter(|r| r.parent == parent).map(|r| r.id).collect();
        let batch: HashSet<Uuid> = updates.iter().map(|u| u.id).collect();
        if batch.len() != updates.len() || batch != children {
            return Err(StoreError::SiblingsChanged);
        }
        apply(tables.rows_mut(scope), parent, updates)
    }

    async fn remove_and_renumber(&self, scope: Scope, removed_id: Uuid) -> Result<(), StoreError> {
        self.begin_write()?;
        let mut tables = self.tables.lock().unwrap();
        let parent = scope.parent_id();

        let mut staged = tables.rows(scope).clone();
        let before = staged.len();
        staged.retain(|r| !(r.id == removed_id && r.parent == parent));
        if staged.len() == before {
            return Err(StoreError::PartialBatch { expected: 1, applied: 0 });
        }

        let mut survivors: Vec<&Row> = staged.iter().filter(|r| r.parent == parent).collect();
        survivors.sort_by_key(|r| r.position);
        let updates = dense_positions(survivors.into_iter().map(|r| r.id));
        apply(&mut staged, parent, &updates)?;

        *tables.rows_mut(scope) = staged;
        if let Scope::Chapters { .. } = scope {
            tables.lessons.retain(|l| l.parent != removed_id);
        }
        Ok(())
    }

    async fn append_chapter(&self, course_id: Uuid, title: &str) -> Result<Option<Sibling>, StoreError> {
        self.begin_write()?;
        let mut tables = self.tables.lock().unwrap();
        let scope = Scope::Chapters { course_id };
        if !tables.parent_exists(scope) {
            return Ok(None);
        }
        let sibling = Sibling { id: Uuid::new_v4(), position: tables.next_position(scope) };
        tables.chapters.push(Row { id: sibling.id, parent: course_id, title: title.to_owned(), position: sibling.position });
        Ok(Some(sibling))
    }

    async fn append_lesson(&self, chapter_id: Uuid, lesson: &NewLesson) -> Result<Option<Sibling>, StoreError> {
        self.begin_write()?;
        let mut tables = self.tables.lock().unwrap();
        let scope = Scope::Lessons { chapter_id };
        if !tables.parent_exists(scope) {
            return Ok(None);
        }
        let sibling = Sibling { id: Uuid::new_v4(), position: tables.next_position(scope) };
        tables.lessons.push(Row {
            id: sibling.id,
            parent: chapter_id,
            title: lesson.title.clone(),
            position: sibling.position,
        });
        Ok(Some(sibling))
    }
}
