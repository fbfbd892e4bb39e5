//! Account management: registration, credential verification, lookups.
//!
//! Passwords are hashed with Argon2id in PHC format; verification never
//! reveals whether the email or the password was wrong.

use super::{Database, now_ms};
use crate::error::ApiError;
use crate::types::User;
use anyhow::Result;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rusqlite::{Connection, Row, params};

/// Hash a password using Argon2id.
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Lowercase the domain part of an email, leaving the local part untouched.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub(crate) fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        is_active: row.get("is_active")?,
        is_staff: row.get("is_staff")?,
        is_admin: row.get("is_admin")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn get_user_internal(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?1")?;

    let result = stmt.query_row(params![user_id], parse_user_row);

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Register a new account. The email must be unique.
    pub fn create_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let now = now_ms();

        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO users (name, email, password_hash, is_active, is_staff, is_admin, created_at)
                 VALUES (?1, ?2, ?3, 1, 0, 0, ?4)",
                params![name, email, password_hash, now],
            );

            match result {
                Ok(_) => {}
                Err(ref e) if is_unique_violation(e) => {
                    return Err(ApiError::conflict("An account with this email already exists")
                        .with_field("email")
                        .into());
                }
                Err(e) => return Err(e.into()),
            }

            let id = conn.last_insert_rowid();

            Ok(User {
                id,
                name: name.to_string(),
                email,
                password_hash,
                is_active: true,
                is_staff: false,
                is_admin: false,
                created_at: now,
            })
        })
    }

    /// Get a user by id.
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_internal(conn, user_id))
    }

    /// Get a user by (normalized) email.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM users WHERE email = ?1")?;

            let result = stmt.query_row(params![email], parse_user_row);

            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Check credentials. Returns the user when the email exists, the account
    /// is active and the password matches; `None` otherwise.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = match self.get_user_by_email(email)? {
            Some(user) => user,
            None => return Ok(None),
        };

        if !user.is_active {
            return Ok(None);
        }

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}
