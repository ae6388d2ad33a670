use crate::error::Result;
use crate::schema::{CouncilMember, Id, Like, Question, Response};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::str::FromStr;
use time::OffsetDateTime;

pub fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    init(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    init(&conn)?;
    Ok(conn)
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
          id TEXT PRIMARY KEY,
          name TEXT,
          email TEXT NOT NULL UNIQUE,
          created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
          token TEXT PRIMARY KEY,
          user_id TEXT NOT NULL REFERENCES users(id),
          expires_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS admin_users (
          id TEXT PRIMARY KEY,
          user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
          role TEXT NOT NULL,
          granted_by TEXT,
          granted_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS council_members (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          party TEXT,
          position TEXT,
          term_start INTEGER,
          term_end INTEGER,
          is_active INTEGER NOT NULL,
          email TEXT,
          phone TEXT,
          website TEXT,
          bio TEXT,
          photo_url TEXT,
          photo_storage_id TEXT,
          created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_members_by_active ON council_members(is_active);

        CREATE TABLE IF NOT EXISTS questions (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          content TEXT NOT NULL,
          category TEXT NOT NULL,
          council_member_id TEXT NOT NULL REFERENCES council_members(id),
          session_date INTEGER NOT NULL,
          session_number TEXT,
          links_json TEXT NOT NULL,
          status TEXT NOT NULL,
          created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_questions_by_member ON questions(council_member_id, session_date);
        CREATE INDEX IF NOT EXISTS idx_questions_by_session_date ON questions(session_date);
        CREATE INDEX IF NOT EXISTS idx_questions_by_category ON questions(category);

        CREATE TABLE IF NOT EXISTS responses (
          id TEXT PRIMARY KEY,
          question_id TEXT NOT NULL REFERENCES questions(id),
          content TEXT NOT NULL,
          respondent_title TEXT NOT NULL,
          department TEXT,
          response_date INTEGER NOT NULL,
          document_url TEXT,
          created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_responses_by_question ON responses(question_id);

        CREATE TABLE IF NOT EXISTS likes (
          id TEXT PRIMARY KEY,
          user_id TEXT NOT NULL,
          question_id TEXT NOT NULL REFERENCES questions(id),
          created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_likes_by_question ON likes(question_id);
        CREATE INDEX IF NOT EXISTS idx_likes_by_user ON likes(user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_user_question ON likes(user_id, question_id);

        CREATE TABLE IF NOT EXISTS news (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          content TEXT NOT NULL,
          category TEXT NOT NULL,
          published_at INTEGER NOT NULL,
          is_published INTEGER NOT NULL,
          thumbnail_url TEXT,
          thumbnail_storage_id TEXT,
          author_id TEXT NOT NULL,
          created_at INTEGER NOT NULL,
          updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_news_by_published ON news(is_published, published_at);

        CREATE TABLE IF NOT EXISTS slides (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          description TEXT,
          image_url TEXT,
          image_storage_id TEXT,
          link_url TEXT,
          background_color TEXT,
          is_active INTEGER NOT NULL,
          sort_order INTEGER NOT NULL,
          created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_slides_by_order ON slides(sort_order);

        CREATE TABLE IF NOT EXISTS faqs (
          id TEXT PRIMARY KEY,
          category TEXT NOT NULL,
          question TEXT NOT NULL,
          answer TEXT NOT NULL,
          sort_order INTEGER NOT NULL,
          is_published INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS contact_submissions (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          email TEXT NOT NULL,
          subject TEXT,
          message TEXT NOT NULL,
          category TEXT NOT NULL,
          status TEXT NOT NULL,
          user_id TEXT,
          created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_contact_by_created ON contact_submissions(created_at);
        "#,
    )?;
    Ok(())
}

/// SQLite reads a negative LIMIT as "no limit", so oversized values clamp.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn new_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}

/// Reads a TEXT column holding one of the schema's text enums.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|err: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) const MEMBER_COLUMNS: &str = "id, name, party, position, term_start, term_end, is_active, \
     email, phone, website, bio, photo_url, photo_storage_id, created_at";

pub(crate) fn member_from_row(row: &Row<'_>) -> rusqlite::Result<CouncilMember> {
    Ok(CouncilMember {
        id: row.get(0)?,
        name: row.get(1)?,
        party: row.get(2)?,
        position: row.get(3)?,
        term_start: row.get(4)?,
        term_end: row.get(5)?,
        is_active: row.get(6)?,
        email: row.get(7)?,
        phone: row.get(8)?,
        website: row.get(9)?,
        bio: row.get(10)?,
        photo_url: row.get(11)?,
        photo_storage_id: row.get(12)?,
        created_at: row.get(13)?,
    })
}

const QUESTION_COLUMNS: &str = "id, title, content, category, council_member_id, session_date, \
     session_number, links_json, status, created_at";

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        council_member_id: row.get(4)?,
        session_date: row.get(5)?,
        session_number: row.get(6)?,
        links: json_column(row, 7)?,
        status: enum_column(row, 8)?,
        created_at: row.get(9)?,
    })
}

const RESPONSE_COLUMNS: &str =
    "id, question_id, content, respondent_title, department, response_date, document_url, created_at";

fn response_from_row(row: &Row<'_>) -> rusqlite::Result<Response> {
    Ok(Response {
        id: row.get(0)?,
        question_id: row.get(1)?,
        content: row.get(2)?,
        respondent_title: row.get(3)?,
        department: row.get(4)?,
        response_date: row.get(5)?,
        document_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn get_member(conn: &Connection, id: &str) -> Result<Option<CouncilMember>> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM council_members WHERE id = ?1");
    let member = conn.query_row(&sql, params![id], member_from_row).optional()?;
    Ok(member)
}

pub fn all_members(conn: &Connection) -> Result<Vec<CouncilMember>> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM council_members ORDER BY created_at ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], member_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_question(conn: &Connection, id: &str) -> Result<Option<Question>> {
    let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
    let question = conn.query_row(&sql, params![id], question_from_row).optional()?;
    Ok(question)
}

/// Every question, newest session first (the `by_session_date` index order).
pub fn questions_by_session_date(conn: &Connection) -> Result<Vec<Question>> {
    let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY session_date DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], question_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// One member's questions, newest session first (the `by_member` index order).
pub fn questions_by_member(conn: &Connection, member_id: &str) -> Result<Vec<Question>> {
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE council_member_id = ?1 \
         ORDER BY session_date DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![member_id], question_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Keyset page over the question indexes, strictly after `after` in
/// `(session_date DESC, id DESC)` order.
pub fn questions_after(
    conn: &Connection,
    member_id: Option<&str>,
    after: Option<(i64, &str)>,
    limit: usize,
) -> Result<Vec<Question>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(member_id) = member_id {
        values.push(Value::Text(member_id.to_string()));
        clauses.push("council_member_id = ?");
    }
    if let Some((session_date, id)) = after {
        values.push(Value::Integer(session_date));
        values.push(Value::Integer(session_date));
        values.push(Value::Text(id.to_string()));
        clauses.push("(session_date < ? OR (session_date = ? AND id < ?))");
    }
    values.push(Value::Integer(sql_limit(limit)));

    let filter = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM questions {filter} ORDER BY session_date DESC, id DESC LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), question_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert_question(conn: &Connection, question: &Question) -> Result<()> {
    let links_json = serde_json::to_string(&question.links)?;
    conn.execute(
        r#"
        INSERT INTO questions (
          id, title, content, category, council_member_id,
          session_date, session_number, links_json, status, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            question.id,
            question.title,
            question.content,
            question.category,
            question.council_member_id,
            question.session_date,
            question.session_number,
            links_json,
            question.status.as_str(),
            question.created_at
        ],
    )?;
    Ok(())
}

pub fn update_question(conn: &Connection, question: &Question) -> Result<()> {
    let links_json = serde_json::to_string(&question.links)?;
    conn.execute(
        r#"
        UPDATE questions SET
          title = ?2,
          content = ?3,
          category = ?4,
          council_member_id = ?5,
          session_date = ?6,
          session_number = ?7,
          links_json = ?8,
          status = ?9
        WHERE id = ?1
        "#,
        params![
            question.id,
            question.title,
            question.content,
            question.category,
            question.council_member_id,
            question.session_date,
            question.session_number,
            links_json,
            question.status.as_str()
        ],
    )?;
    Ok(())
}

pub fn responses_by_question(conn: &Connection, question_id: &str) -> Result<Vec<Response>> {
    let sql = format!(
        "SELECT {RESPONSE_COLUMNS} FROM responses WHERE question_id = ?1 ORDER BY response_date ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![question_id], response_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert_response(conn: &Connection, response: &Response) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO responses (
          id, question_id, content, respondent_title, department,
          response_date, document_url, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            response.id,
            response.question_id,
            response.content,
            response.respondent_title,
            response.department,
            response.response_date,
            response.document_url,
            response.created_at
        ],
    )?;
    Ok(())
}

pub fn likes_by_question(conn: &Connection, question_id: &str) -> Result<Vec<Like>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, question_id, created_at FROM likes WHERE question_id = ?1 ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(params![question_id], |row| {
        Ok(Like {
            id: row.get(0)?,
            user_id: row.get(1)?,
            question_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn like_counts(conn: &Connection) -> Result<HashMap<Id, usize>> {
    let mut stmt = conn.prepare("SELECT question_id, COUNT(*) FROM likes GROUP BY question_id")?;
    let rows = stmt.query_map([], |row| {
        let question_id: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok((question_id, count as usize))
    })?;
    Ok(rows.collect::<rusqlite::Result<HashMap<_, _>>>()?)
}
