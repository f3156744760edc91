//! Course outline model shared by the `coursedeck` server and its clients.
//!
//! This crate owns the wire types for course structure and reorder commits,
//! plus the client-side tree state that the admin editor mutates on drag.
//!
//! DESIGN
//! ======
//! Chapters and lessons are two independent ordering scopes: chapters are
//! ranked within a course, lessons within their chapter. A drag is reduced
//! to a pure function over the tree ([`reorder`]) and a separate commit step
//! ([`Outline::apply_drag`] / [`Outline::settle`]) so the algorithm never
//! depends on a UI toolkit.

pub mod commit;
pub mod drag;
#[cfg(feature = "http")]
pub mod http;
pub mod model;
pub mod tree;

pub use commit::{CommitTransport, PendingCommit, ReorderRequest, Settlement, TransportError};
pub use drag::{DragEvent, DragHandle, ItemScope, MoveError, Reordered, reorder};
pub use model::{ApiResponse, ApiStatus, ChapterData, CourseStructure, LessonData, PositionUpdate, dense_positions};
pub use tree::{ChapterNode, LessonNode, Outline};
