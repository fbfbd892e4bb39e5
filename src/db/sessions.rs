//! Bearer-token sessions.

use super::users::parse_user_row;
use super::{Database, now_ms};
use crate::types::{Session, User};
use anyhow::Result;
use rusqlite::params;
use uuid::Uuid;

impl Database {
    /// Create a session for a user, valid for `ttl_hours`.
    pub fn create_session(&self, user_id: i64, ttl_hours: i64) -> Result<Session> {
        let token = Uuid::new_v4().to_string();
        let now = now_ms();
        let expires_at = now + ttl_hours * 3_600_000;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id, now, expires_at],
            )?;

            Ok(Session {
                token: token.clone(),
                user_id,
                created_at: now,
                expires_at,
            })
        })
    }

    /// Resolve a session token to its user. Expired or unknown tokens
    /// resolve to `None`.
    pub fn session_user(&self, token: &str, now: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.* FROM users u
                 INNER JOIN sessions s ON s.user_id = u.id
                 WHERE s.token = ?1 AND s.expires_at > ?2",
            )?;

            let result = stmt.query_row(params![token, now], parse_user_row);

            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Delete a session. Returns whether a row was removed.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(deleted > 0)
        })
    }

    /// Remove expired sessions. Returns how many were purged.
    pub fn purge_expired_sessions(&self, now: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let purged =
                conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
            Ok(purged)
        })
    }
}
