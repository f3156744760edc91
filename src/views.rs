//! Cached page projections.
//!
//! The course edit page reads its chapter/lesson tree from here instead of
//! the store. Structural mutations invalidate the entry for the course so
//! the next read reloads from the store.

use std::collections::HashMap;
use std::sync::Arc;

use outline::CourseStructure;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::services::store::{StoreError, StructureStore};

#[derive(Default)]
struct Views {
    entries: HashMap<String, CourseStructure>,
    /// Bumped by every invalidation; a load only caches its result if the
    /// generation it started under is still current.
    generations: HashMap<String, u64>,
}

impl Views {
    fn generation(&self, path: &str) -> u64 {
        self.generations.get(path).copied().unwrap_or(0)
    }
}

#[derive(Clone, Default)]
pub struct ViewCache {
    views: Arc<RwLock<Views>>,
}

impl ViewCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the admin edit page for a course.
    #[must_use]
    pub fn edit_path(course_id: Uuid) -> String {
        format!("/admin/courses/{course_id}/edit")
    }

    pub async fn get(&self, path: &str) -> Option<CourseStructure> {
        self.views.read().await.entries.get(path).cloned()
    }

    pub async fn insert(&self, path: String, view: CourseStructure) {
        self.views.write().await.entries.insert(path, view);
    }

    /// Drop the cached view at `path`. Returns whether an entry existed.
    pub async fn invalidate(&self, path: &str) -> bool {
        let mut views = self.views.write().await;
        *views.generations.entry(path.to_owned()).or_default() += 1;
        let removed = views.entries.remove(path).is_some();
        tracing::debug!(path, removed, "view invalidated");
        removed
    }

    /// Cached edit view for `course_id`, loading and caching it on a miss.
    /// Missing courses are not cached, and neither is a load that an
    /// invalidation overtook.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the load.
    pub async fn get_or_load(
        &self,
        course_id: Uuid,
        store: &dyn StructureStore,
    ) -> Result<Option<CourseStructure>, StoreError> {
        let path = Self::edit_path(course_id);
        let started = {
            let views = self.views.read().await;
            if let Some(view) = views.entries.get(&path) {
                return Ok(Some(view.clone()));
            }
            views.generation(&path)
        };

        let Some(view) = store.load_structure(course_id).await? else {
            return Ok(None);
        };

        let mut views = self.views.write().await;
        if views.generation(&path) == started {
            views.entries.insert(path, view.clone());
        } else {
            tracing::debug!(path, "view invalidated during load; not cached");
        }
        Ok(Some(view))
    }
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;
