//! Client-side outline tree.
//!
//! DESIGN
//! ======
//! `Outline` is a disposable projection of [`CourseStructure`] shaped for the
//! editor: chapters carry an expand/collapse flag the store knows nothing
//! about. It is rebuilt from authoritative data after every refresh and
//! mutated optimistically on drag (see `commit.rs`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{ChapterData, CourseStructure, LessonData};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonNode {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterNode {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub is_open: bool,
    pub lessons: Vec<LessonNode>,
}

/// Editor state for one course.
#[derive(Clone, Debug, Default)]
pub struct Outline {
    pub(crate) course_id: Uuid,
    pub(crate) chapters: Vec<ChapterNode>,
    /// Ticket handed to the most recent `apply_drag`.
    pub(crate) last_ticket: u64,
    /// Newest dispatched commit that has not resolved yet.
    pub(crate) in_flight: Option<u64>,
    /// Highest ticket that resolved while it was the newest.
    pub(crate) settled_through: u64,
    /// Highest ticket dispatched before the last `initialize`.
    pub(crate) detached_through: u64,
    pub(crate) needs_refresh: bool,
}

impl Outline {
    #[must_use]
    pub fn from_structure(data: &CourseStructure) -> Self {
        let mut outline = Self::default();
        outline.initialize(data);
        outline
    }

    /// Rebuild from authoritative data, keeping each known chapter's
    /// expand flag. New chapters start expanded.
    ///
    /// Commits still in flight are detached: their responses settle as
    /// superseded and never roll this tree back. The refresh may have read
    /// the store before a detached commit landed, so any detached response
    /// raises [`needs_refresh`](Self::needs_refresh).
    pub fn initialize(&mut self, data: &CourseStructure) {
        let open_flags: HashMap<Uuid, bool> = self.chapters.iter().map(|c| (c.id, c.is_open)).collect();

        let mut chapters: Vec<ChapterNode> = data
            .chapters
            .iter()
            .map(|chapter| chapter_node(chapter, open_flags.get(&chapter.id).copied().unwrap_or(true)))
            .collect();
        chapters.sort_by_key(|c| c.position);

        self.course_id = data.id;
        self.chapters = chapters;
        self.in_flight = None;
        self.settled_through = self.last_ticket;
        self.detached_through = self.last_ticket;
        self.needs_refresh = false;
    }

    #[must_use]
    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    #[must_use]
    pub fn chapters(&self) -> &[ChapterNode] {
        &self.chapters
    }

    #[must_use]
    pub fn chapter(&self, chapter_id: Uuid) -> Option<&ChapterNode> {
        self.chapters.iter().find(|c| c.id == chapter_id)
    }

    /// True when a superseded commit resolved in a way that may have left
    /// the store out of step with this tree. Callers should re-fetch and
    /// [`initialize`](Self::initialize).
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    /// Whether a commit is waiting on the server.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Flip a chapter's expand flag. Returns the new value, or `None` for
    /// an unknown chapter.
    pub fn toggle_chapter(&mut self, chapter_id: Uuid) -> Option<bool> {
        let chapter = self.chapters.iter_mut().find(|c| c.id == chapter_id)?;
        chapter.is_open = !chapter.is_open;
        Some(chapter.is_open)
    }

    /// Replace the chapter list with `snapshot`, keeping the expand flags
    /// the user set since the snapshot was taken.
    pub(crate) fn restore(&mut self, snapshot: Vec<ChapterNode>) {
        let open_flags: HashMap<Uuid, bool> = self.chapters.iter().map(|c| (c.id, c.is_open)).collect();
        self.chapters = snapshot;
        for chapter in &mut self.chapters {
            if let Some(is_open) = open_flags.get(&chapter.id) {
                chapter.is_open = *is_open;
            }
        }
    }
}

fn chapter_node(chapter: &ChapterData, is_open: bool) -> ChapterNode {
    let mut lessons: Vec<LessonNode> = chapter.lessons.iter().map(lesson_node).collect();
    lessons.sort_by_key(|l| l.position);
    ChapterNode { id: chapter.id, title: chapter.title.clone(), position: chapter.position, is_open, lessons }
}

fn lesson_node(lesson: &LessonData) -> LessonNode {
    LessonNode { id: lesson.id, title: lesson.title.clone(), position: lesson.position }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tests;
