//! Caller identity: users, sessions and the token lookup the HTTP layer
//! uses to decide who is calling.

use crate::db::{new_id, now_ms};
use crate::error::{CouncilError, Result};
use crate::schema::{Id, User};
use rusqlite::{params, Connection, OptionalExtension};

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Resolves a request credential to the caller's user id.
pub trait Identity: Send + Sync {
    fn caller_for_token(&self, conn: &Connection, token: &str) -> Result<Option<Id>>;
}

/// Looks bearer tokens up in the `sessions` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionIdentity;

impl Identity for SessionIdentity {
    fn caller_for_token(&self, conn: &Connection, token: &str) -> Result<Option<Id>> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        let user_id = conn
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                params![token, now_ms()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, created_at FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Returns the user with `email`, creating it on first sight.
pub fn ensure_user(conn: &Connection, email: &str, name: Option<&str>) -> Result<User> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CouncilError::validation("email is required"));
    }
    if let Some(user) = find_user_by_email(conn, email)? {
        return Ok(user);
    }

    let user = User {
        id: new_id(),
        name: name.map(str::to_string),
        email: email.to_string(),
        created_at: now_ms(),
    };
    conn.execute(
        "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.name, user.email, user.created_at],
    )?;
    tracing::info!(user_id = %user.id, "created user");
    Ok(user)
}

pub fn issue_session(conn: &Connection, user_id: &str, ttl_hours: i64) -> Result<String> {
    let token = new_id();
    let expires_at = now_ms() + ttl_hours * HOUR_MS;
    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, expires_at],
    )?;
    tracing::info!(user_id, "issued session");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn expired_and_unknown_tokens_resolve_to_no_caller() {
        let conn = db::open_in_memory().expect("open db");
        let user = ensure_user(&conn, "citizen@example.jp", None).expect("user");
        let token = issue_session(&conn, &user.id, 1).expect("session");
        let expired = issue_session(&conn, &user.id, -1).expect("expired session");

        let identity = SessionIdentity;
        assert_eq!(
            identity.caller_for_token(&conn, &token).expect("lookup"),
            Some(user.id.clone())
        );
        assert_eq!(identity.caller_for_token(&conn, &expired).expect("lookup"), None);
        assert_eq!(identity.caller_for_token(&conn, "nope").expect("lookup"), None);
    }
}
