use crate::auth::require_caller;
use crate::db::{self, new_id, now_ms};
use crate::error::{CouncilError, Result};
use crate::schema::LikeState;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

/// Flips the caller's like on a question.
///
/// The delete-or-insert runs under an IMMEDIATE transaction and the
/// `(user_id, question_id)` unique index, so concurrent toggles from the
/// same user serialize and can never leave a duplicate row behind.
pub fn toggle_like(conn: &Connection, caller: Option<&str>, question_id: &str) -> Result<LikeState> {
    let user_id = require_caller(caller)?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    if db::get_question(&tx, question_id)?.is_none() {
        return Err(CouncilError::NotFound("question"));
    }

    let removed = tx.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND question_id = ?2",
        params![user_id, question_id],
    )?;
    let liked = if removed > 0 {
        false
    } else {
        tx.execute(
            r#"
            INSERT INTO likes (id, user_id, question_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, question_id) DO NOTHING
            "#,
            params![new_id(), user_id, question_id, now_ms()],
        )?;
        true
    };

    let like_count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM likes WHERE question_id = ?1",
        params![question_id],
        |row| row.get(0),
    )?;
    tx.commit()?;

    tracing::info!(user_id, question_id, liked, "toggled like");
    Ok(LikeState {
        liked,
        like_count: like_count as usize,
    })
}
