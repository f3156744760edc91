//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool for course and session queries, the
//! structure store behind a trait object, the edit-view cache, and the
//! parsed configuration.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::store::{PgStructureStore, StructureStore};
use crate::views::ViewCache;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub store: Arc<dyn StructureStore>,
    pub views: ViewCache,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// State backed by Postgres for both course rows and structure.
    #[must_use]
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let store = Arc::new(PgStructureStore::new(pool.clone()));
        Self::with_store(pool, store, config)
    }

    #[must_use]
    pub fn with_store(pool: PgPool, store: Arc<dyn StructureStore>, config: AppConfig) -> Self {
        Self { pool, store, views: ViewCache::new(), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
