//! Optimistic reorder commits.
//!
//! DESIGN
//! ======
//! A drag is applied to the local tree immediately. The tree as it was
//! before the drag travels with the [`PendingCommit`] and is restored if the
//! server rejects the new ordering.
//!
//! SEQUENCING
//! ==========
//! Every commit gets a ticket. Only the newest outstanding ticket may roll
//! the tree back; an older commit that resolves later is reported as
//! [`Settlement::Superseded`] and its response is dropped. When such a
//! stale response failed, or arrived after a newer commit had already
//! settled, or was detached by a refresh, the server may hold an ordering
//! this tree does not show, so [`Outline::needs_refresh`] is raised. The server side stays
//! last-write-wins.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::drag::{DragEvent, MoveError, MovedScope, reorder};
use crate::model::{ApiResponse, PositionUpdate};
use crate::tree::{ChapterNode, Outline};

// =============================================================================
// REQUEST
// =============================================================================

/// Full position assignment for one scope, as sent to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ReorderRequest {
    Chapters { course_id: Uuid, items: Vec<PositionUpdate> },
    Lessons { course_id: Uuid, chapter_id: Uuid, items: Vec<PositionUpdate> },
}

impl ReorderRequest {
    #[must_use]
    pub fn items(&self) -> &[PositionUpdate] {
        match self {
            Self::Chapters { items, .. } | Self::Lessons { items, .. } => items,
        }
    }

    #[must_use]
    pub fn course_id(&self) -> Uuid {
        match self {
            Self::Chapters { course_id, .. } | Self::Lessons { course_id, .. } => *course_id,
        }
    }

    /// Message shown when the commit fails without a server explanation.
    #[must_use]
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Chapters { .. } => "Failed to reorder chapters",
            Self::Lessons { .. } => "Failed to reorder lessons",
        }
    }
}

// =============================================================================
// PENDING / SETTLEMENT
// =============================================================================

/// A locally applied move awaiting server confirmation.
#[derive(Debug)]
pub struct PendingCommit {
    ticket: u64,
    previous: Vec<ChapterNode>,
    request: ReorderRequest,
}

impl PendingCommit {
    #[must_use]
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    #[must_use]
    pub fn request(&self) -> &ReorderRequest {
        &self.request
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Server accepted the ordering; the optimistic tree stands.
    Confirmed { message: String },
    /// Server rejected it; the pre-drag tree was restored.
    RolledBack { message: String },
    /// A newer commit (or a refresh) replaced this one; nothing changed.
    Superseded,
}

#[derive(Debug, thiserror::Error)]
#[error("reorder transport failed: {0}")]
pub struct TransportError(pub String);

/// Sends a reorder commit to whoever owns the authoritative ordering.
#[async_trait::async_trait]
pub trait CommitTransport: Send + Sync {
    async fn send(&self, request: &ReorderRequest) -> Result<ApiResponse, TransportError>;
}

// =============================================================================
// OUTLINE COMMANDS
// =============================================================================

impl Outline {
    /// Apply a drag locally and build the commit for it.
    ///
    /// Returns `Ok(None)` for no-op gestures. On `Err` the tree is left
    /// untouched and no commit exists, so nothing is sent.
    ///
    /// # Errors
    ///
    /// Propagates the [`MoveError`] from [`reorder`].
    pub fn apply_drag(&mut self, event: &DragEvent) -> Result<Option<PendingCommit>, MoveError> {
        let Some(reordered) = reorder(&self.chapters, event)? else {
            return Ok(None);
        };

        let items = reordered.payload();
        let request = match reordered.scope {
            MovedScope::Chapters => ReorderRequest::Chapters { course_id: self.course_id, items },
            MovedScope::Lessons { chapter_id } => {
                ReorderRequest::Lessons { course_id: self.course_id, chapter_id, items }
            }
        };

        let previous = std::mem::replace(&mut self.chapters, reordered.chapters);
        self.last_ticket += 1;
        self.in_flight = Some(self.last_ticket);

        Ok(Some(PendingCommit { ticket: self.last_ticket, previous, request }))
    }

    /// Reconcile a commit with the server's answer.
    pub fn settle(&mut self, pending: PendingCommit, response: &ApiResponse) -> Settlement {
        if self.in_flight != Some(pending.ticket) {
            let stale = pending.ticket < self.settled_through || pending.ticket <= self.detached_through;
            if !response.is_success() || stale {
                self.needs_refresh = true;
            }
            return Settlement::Superseded;
        }

        self.in_flight = None;
        self.settled_through = pending.ticket;

        if response.is_success() {
            Settlement::Confirmed { message: response.message.clone() }
        } else {
            self.restore(pending.previous);
            Settlement::RolledBack { message: response.message.clone() }
        }
    }

    /// Apply a drag, send the commit and settle it in one step.
    ///
    /// This holds `&mut self` across the round-trip, so it cannot overlap
    /// with another drag. Use [`apply_drag`](Self::apply_drag) and
    /// [`settle`](Self::settle) directly when the UI keeps accepting input
    /// while a commit is in flight.
    ///
    /// # Errors
    ///
    /// Returns the [`MoveError`] for rejected gestures; no request is sent.
    pub async fn drag_and_commit<T>(
        &mut self,
        event: &DragEvent,
        transport: &T,
    ) -> Result<Option<Settlement>, MoveError>
    where
        T: CommitTransport + ?Sized,
    {
        let Some(pending) = self.apply_drag(event)? else {
            return Ok(None);
        };

        let response = transport
            .send(pending.request())
            .await
            .unwrap_or_else(|_| ApiResponse::error(pending.request().failure_message()));
        Ok(Some(self.settle(pending, &response)))
    }
}

#[cfg(test)]
#[path = "commit_test.rs"]
mod tests;
