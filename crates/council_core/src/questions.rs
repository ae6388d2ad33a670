//! Admin writes for questions and the administration's responses.

use crate::auth::require_admin;
use crate::db::{self, new_id, now_ms};
use crate::error::{CouncilError, Result};
use crate::schema::{Id, Question, QuestionStatus, Response, clearable};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    pub title: String,
    pub content: String,
    pub category: String,
    pub council_member_id: Id,
    pub session_date: i64,
    pub session_number: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    pub status: Option<QuestionStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub council_member_id: Option<Id>,
    pub session_date: Option<i64>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub session_number: Option<Option<String>>,
    pub links: Option<Vec<String>>,
    pub status: Option<QuestionStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInput {
    pub content: String,
    pub respondent_title: String,
    pub department: Option<String>,
    pub response_date: i64,
    pub document_url: Option<String>,
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CouncilError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn require_member(conn: &Connection, member_id: &str) -> Result<()> {
    match db::get_member(conn, member_id)? {
        Some(_) => Ok(()),
        None => Err(CouncilError::validation(
            "councilMemberId does not reference a council member",
        )),
    }
}

pub fn create_question(conn: &Connection, caller: Option<&str>, input: QuestionInput) -> Result<Id> {
    require_admin(conn, caller)?;
    let question = Question {
        id: new_id(),
        title: require_text(&input.title, "title")?,
        content: require_text(&input.content, "content")?,
        category: require_text(&input.category, "category")?,
        council_member_id: require_text(&input.council_member_id, "councilMemberId")?,
        session_date: input.session_date,
        session_number: input.session_number,
        links: input.links,
        status: input.status.unwrap_or(QuestionStatus::Pending),
        created_at: now_ms(),
    };
    require_member(conn, &question.council_member_id)?;

    db::insert_question(conn, &question)?;
    tracing::info!(question_id = %question.id, member_id = %question.council_member_id, "created question");
    Ok(question.id)
}

pub fn update_question(
    conn: &Connection,
    caller: Option<&str>,
    id: &str,
    patch: QuestionPatch,
) -> Result<Question> {
    require_admin(conn, caller)?;
    let mut question = db::get_question(conn, id)?.ok_or(CouncilError::NotFound("question"))?;

    if let Some(title) = patch.title {
        question.title = require_text(&title, "title")?;
    }
    if let Some(content) = patch.content {
        question.content = require_text(&content, "content")?;
    }
    if let Some(category) = patch.category {
        question.category = require_text(&category, "category")?;
    }
    if let Some(member_id) = patch.council_member_id {
        require_member(conn, &member_id)?;
        question.council_member_id = member_id;
    }
    if let Some(session_date) = patch.session_date {
        question.session_date = session_date;
    }
    if let Some(links) = patch.links {
        question.links = links;
    }
    if let Some(status) = patch.status {
        question.status = status;
    }
    if let Some(session_number) = patch.session_number {
        question.session_number = session_number;
    }

    db::update_question(conn, &question)?;
    tracing::info!(question_id = %question.id, "updated question");
    Ok(question)
}

/// Removes the question together with its likes and responses.
pub fn delete_question(conn: &Connection, caller: Option<&str>, id: &str) -> Result<()> {
    require_admin(conn, caller)?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM likes WHERE question_id = ?1", params![id])?;
    tx.execute("DELETE FROM responses WHERE question_id = ?1", params![id])?;
    let deleted = tx.execute("DELETE FROM questions WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(CouncilError::NotFound("question"));
    }
    tx.commit()?;
    tracing::info!(question_id = id, "deleted question");
    Ok(())
}

/// Records a response and marks a pending question as answered.
pub fn create_response(
    conn: &Connection,
    caller: Option<&str>,
    question_id: &str,
    input: ResponseInput,
) -> Result<Id> {
    require_admin(conn, caller)?;
    let mut question =
        db::get_question(conn, question_id)?.ok_or(CouncilError::NotFound("question"))?;

    let response = Response {
        id: new_id(),
        question_id: question.id.clone(),
        content: require_text(&input.content, "content")?,
        respondent_title: require_text(&input.respondent_title, "respondentTitle")?,
        department: input.department,
        response_date: input.response_date,
        document_url: input.document_url,
        created_at: now_ms(),
    };

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    db::insert_response(&tx, &response)?;
    if question.status == QuestionStatus::Pending {
        question.status = QuestionStatus::Answered;
        db::update_question(&tx, &question)?;
    }
    tx.commit()?;

    tracing::info!(response_id = %response.id, question_id, "created response");
    Ok(response.id)
}

/// Deletes a response; a question left without responses goes back to pending.
pub fn delete_response(conn: &Connection, caller: Option<&str>, id: &str) -> Result<()> {
    require_admin(conn, caller)?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let question_id: Option<String> = tx
        .query_row(
            "SELECT question_id FROM responses WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(question_id) = question_id else {
        return Err(CouncilError::NotFound("response"));
    };
    tx.execute("DELETE FROM responses WHERE id = ?1", params![id])?;

    if db::responses_by_question(&tx, &question_id)?.is_empty() {
        tx.execute(
            "UPDATE questions SET status = ?2 WHERE id = ?1 AND status = ?3",
            params![
                question_id,
                QuestionStatus::Pending.as_str(),
                QuestionStatus::Answered.as_str()
            ],
        )?;
    }
    tx.commit()?;
    tracing::info!(response_id = id, question_id = %question_id, "deleted response");
    Ok(())
}
