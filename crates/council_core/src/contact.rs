use crate::auth::require_admin;
use crate::db::{enum_column, new_id, now_ms};
use crate::error::{CouncilError, Result};
use crate::schema::{ContactCategory, ContactStatus, ContactSubmission, Id};
use rusqlite::{params, Connection};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub category: ContactCategory,
}

impl ContactForm {
    /// Presence checks run before anything is dispatched or stored.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CouncilError::validation("name is required"));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(CouncilError::validation("email is required"));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(CouncilError::validation("email is malformed")),
        }
        if self.message.trim().is_empty() {
            return Err(CouncilError::validation("message is required"));
        }
        Ok(())
    }
}

pub fn submit_contact_form(conn: &Connection, caller: Option<&str>, form: ContactForm) -> Result<Id> {
    form.validate()?;
    let submission = ContactSubmission {
        id: new_id(),
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        subject: form.subject.filter(|subject| !subject.trim().is_empty()),
        message: form.message,
        category: form.category,
        status: ContactStatus::Unread,
        user_id: caller.map(str::to_string),
        created_at: now_ms(),
    };
    conn.execute(
        r#"
        INSERT INTO contact_submissions (
          id, name, email, subject, message, category, status, user_id, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            submission.id,
            submission.name,
            submission.email,
            submission.subject,
            submission.message,
            submission.category.as_str(),
            submission.status.as_str(),
            submission.user_id,
            submission.created_at
        ],
    )?;
    tracing::info!(submission_id = %submission.id, category = %submission.category, "received contact form");
    Ok(submission.id)
}

/// Admin inbox, newest first.
pub fn list_contact_submissions(
    conn: &Connection,
    caller: Option<&str>,
    status: Option<ContactStatus>,
) -> Result<Vec<ContactSubmission>> {
    require_admin(conn, caller)?;
    let mut stmt = conn.prepare(
        r#"
        SELECT id, name, email, subject, message, category, status, user_id, created_at
        FROM contact_submissions
        WHERE ?1 IS NULL OR status = ?1
        ORDER BY created_at DESC, id DESC
        "#,
    )?;
    let rows = stmt.query_map(params![status.map(|s| s.as_str())], |row| {
        Ok(ContactSubmission {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            subject: row.get(3)?,
            message: row.get(4)?,
            category: enum_column(row, 5)?,
            status: enum_column(row, 6)?,
            user_id: row.get(7)?,
            created_at: row.get(8)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn set_contact_status(
    conn: &Connection,
    caller: Option<&str>,
    id: &str,
    status: ContactStatus,
) -> Result<()> {
    require_admin(conn, caller)?;
    let updated = conn.execute(
        "UPDATE contact_submissions SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    if updated == 0 {
        return Err(CouncilError::NotFound("contact submission"));
    }
    tracing::info!(submission_id = id, status = %status, "updated contact status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(message: &str) -> ContactForm {
        ContactForm {
            name: "市民".to_string(),
            email: "citizen@example.jp".to_string(),
            subject: None,
            message: message.to_string(),
            category: ContactCategory::General,
        }
    }

    #[test]
    fn empty_message_is_rejected() {
        assert!(matches!(form("").validate(), Err(CouncilError::Validation(_))));
        assert!(matches!(form("   ").validate(), Err(CouncilError::Validation(_))));
        assert!(form("ご意見").validate().is_ok());
    }

    #[test]
    fn email_needs_both_sides_of_the_at_sign() {
        let mut bad = form("hi");
        bad.email = "citizen@".to_string();
        assert!(bad.validate().is_err());
        bad.email = "citizen.example.jp".to_string();
        assert!(bad.validate().is_err());
    }
}
