//! Authorization checks for admin-only operations.
//!
//! Every structural mutation calls [`require_admin`] before it reads the
//! store. The check fails closed: any role that is not explicitly `Admin`
//! is rejected.

use uuid::Uuid;

use crate::services::session::{Role, SessionUser};

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("admin access required (user {0})")]
    NotAdmin(Uuid),
}

/// Require the actor to hold the admin role.
///
/// # Errors
///
/// Returns [`AccessError::NotAdmin`] for every non-admin actor.
pub fn require_admin(actor: &SessionUser) -> Result<(), AccessError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::User => {
            tracing::warn!(user_id = %actor.id, "admin operation denied");
            Err(AccessError::NotAdmin(actor.id))
        }
    }
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
