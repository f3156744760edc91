//! Session lookup and revocation.
//!
//! ARCHITECTURE
//! ============
//! Sign-in (email code, GitHub) is handled by an external auth service that
//! writes rows into `sessions`. This module only resolves a cookie token to
//! the user and role behind it, and deletes sessions on logout.

use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Account role. Only `Admin` may author course structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Parse the `users.role` column. Unknown values map to `User` so a
    /// bad row never grants admin rights.
    #[must_use]
    pub fn from_db(raw: &str) -> Self {
        match raw {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

/// User row returned from session validation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    /// Unique user identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    pub email: Option<String>,
    /// Avatar image URL, if available.
    pub image: Option<String>,
    pub role: Role,
}

/// Validate a session token and return the associated user.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.name, u.email, u.image, u.role
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| {
        let role: String = r.get("role");
        SessionUser {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
            image: r.get("image"),
            role: Role::from_db(&role),
        }
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
