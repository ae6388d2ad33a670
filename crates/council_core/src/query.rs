//! Read path for council questions: select a base set from an index,
//! filter, sort, paginate, then join each row to its member, responses and
//! likes.
//!
//! The offset variant and the unpaginated list materialize every matching
//! question before slicing. That is fine at municipal volumes and is the
//! first thing to revisit if the table grows; the row counts are logged at
//! debug level for that reason.

use crate::db;
use crate::error::{CouncilError, Result};
use crate::filter::{QuestionFilter, SortBy, paginate, sort_questions};
use crate::media::{BlobStore, resolve_image};
use crate::schema::{
    CursorPage, EnrichedQuestion, Pagination, Question, QuestionDetail, QuestionPage,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rusqlite::Connection;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_TOP_LIKED_LIMIT: usize = 10;
pub const UNKNOWN_MEMBER_NAME: &str = "不明";

/// Everything a read needs besides its arguments.
#[derive(Clone, Copy)]
pub struct QueryContext<'a> {
    pub conn: &'a Connection,
    pub blobs: &'a dyn BlobStore,
    pub caller: Option<&'a str>,
}

impl<'a> QueryContext<'a> {
    pub fn new(conn: &'a Connection, blobs: &'a dyn BlobStore, caller: Option<&'a str>) -> Self {
        Self { conn, blobs, caller }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PagedSort {
    #[default]
    Newest,
    Oldest,
    Title,
}

impl From<PagedSort> for SortBy {
    fn from(value: PagedSort) -> Self {
        match value {
            PagedSort::Newest => SortBy::Newest,
            PagedSort::Oldest => SortBy::Oldest,
            PagedSort::Title => SortBy::Title,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuestionsPaged {
    pub page: usize,
    pub page_size: Option<usize>,
    pub category: Option<String>,
    pub member_id: Option<String>,
    pub search_term: Option<String>,
    pub session_number: Option<String>,
    pub sort_by: Option<PagedSort>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationOpts {
    pub num_items: usize,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListQuestionsPaginated {
    pub pagination_opts: PaginationOpts,
    pub category: Option<String>,
    pub member_id: Option<String>,
    pub search_term: Option<String>,
}

/// Joins one question to its member, responses and likes. Dangling
/// references fall back to placeholder values instead of failing.
pub fn enrich(ctx: &QueryContext<'_>, question: Question) -> Result<EnrichedQuestion> {
    let member = db::get_member(ctx.conn, &question.council_member_id)?;
    let responses = db::responses_by_question(ctx.conn, &question.id)?;
    let likes = db::likes_by_question(ctx.conn, &question.id)?;

    let is_liked = ctx
        .caller
        .is_some_and(|caller| likes.iter().any(|like| like.user_id == caller));

    let (member_name, member_party, member_photo_url) = match member {
        Some(member) => {
            let photo = resolve_image(ctx.blobs, member.photo_url, member.photo_storage_id.as_deref());
            (member.name, member.party, photo)
        }
        None => (UNKNOWN_MEMBER_NAME.to_string(), None, None),
    };

    Ok(EnrichedQuestion {
        question,
        member_name,
        member_party,
        member_photo_url,
        response_count: responses.len(),
        like_count: likes.len(),
        is_liked,
    })
}

fn enrich_all(ctx: &QueryContext<'_>, questions: Vec<Question>) -> Result<Vec<EnrichedQuestion>> {
    questions
        .into_iter()
        .map(|question| enrich(ctx, question))
        .collect()
}

fn base_set(conn: &Connection, member_id: Option<&str>) -> Result<Vec<Question>> {
    let rows = match member_id {
        Some(member_id) => db::questions_by_member(conn, member_id)?,
        None => db::questions_by_session_date(conn)?,
    };
    debug!(rows = rows.len(), by_member = member_id.is_some(), "materialized question set");
    Ok(rows)
}

/// Full matching list, newest session first, every row enriched.
pub fn list_questions(ctx: &QueryContext<'_>, filter: &QuestionFilter) -> Result<Vec<EnrichedQuestion>> {
    let mut rows = base_set(ctx.conn, filter.member_id())?;
    rows.retain(|question| filter.matches(question));
    enrich_all(ctx, rows)
}

pub fn search_questions_paged(ctx: &QueryContext<'_>, args: SearchQuestionsPaged) -> Result<QuestionPage> {
    let page_size = args.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if args.page < 1 {
        return Err(CouncilError::validation("page must be at least 1"));
    }
    if page_size < 1 {
        return Err(CouncilError::validation("pageSize must be at least 1"));
    }

    let filter = QuestionFilter {
        category: args.category,
        member_id: args.member_id,
        search_term: args.search_term,
        session_number: args.session_number,
        status: None,
    };

    let mut rows = base_set(ctx.conn, filter.member_id())?;
    rows.retain(|question| filter.matches(question));
    sort_questions(&mut rows, args.sort_by.unwrap_or_default().into());

    let pagination = Pagination::new(args.page, page_size, rows.len());
    let questions = enrich_all(ctx, paginate(&rows, args.page, page_size).to_vec())?;

    Ok(QuestionPage {
        questions,
        pagination,
    })
}

/// Pages at the storage layer first and filters the fetched page after, so
/// a filtered page can come back shorter than `num_items` while
/// `is_done` is still false.
pub fn list_questions_paginated(ctx: &QueryContext<'_>, args: ListQuestionsPaginated) -> Result<CursorPage> {
    let num_items = args.pagination_opts.num_items;
    if num_items < 1 {
        return Err(CouncilError::validation("numItems must be at least 1"));
    }
    let after = args
        .pagination_opts
        .cursor
        .as_deref()
        .filter(|cursor| !cursor.is_empty())
        .map(decode_cursor)
        .transpose()?;

    let filter = QuestionFilter {
        category: args.category,
        member_id: args.member_id,
        search_term: args.search_term,
        session_number: None,
        status: None,
    };

    let mut rows = db::questions_after(
        ctx.conn,
        filter.member_id(),
        after.as_ref().map(|(date, id)| (*date, id.as_str())),
        num_items.saturating_add(1),
    )?;
    let is_done = rows.len() <= num_items;
    rows.truncate(num_items);

    let continue_cursor = match rows.last() {
        Some(last) => encode_cursor(last.session_date, &last.id),
        None => args.pagination_opts.cursor.unwrap_or_default(),
    };

    rows.retain(|question| filter.matches(question));
    let page = enrich_all(ctx, rows)?;

    Ok(CursorPage {
        page,
        is_done,
        continue_cursor,
    })
}

/// Questions ranked by like count; ties keep newest-session-first order.
pub fn get_top_liked_questions(ctx: &QueryContext<'_>, limit: usize) -> Result<Vec<EnrichedQuestion>> {
    let counts = db::like_counts(ctx.conn)?;
    let mut rows = db::questions_by_session_date(ctx.conn)?;
    rows.sort_by_key(|question| std::cmp::Reverse(counts.get(&question.id).copied().unwrap_or(0)));
    rows.truncate(limit);
    enrich_all(ctx, rows)
}

pub fn get_question(ctx: &QueryContext<'_>, id: &str) -> Result<Option<QuestionDetail>> {
    let Some(question) = db::get_question(ctx.conn, id)? else {
        return Ok(None);
    };
    let member = crate::members::get_member(ctx.conn, ctx.blobs, &question.council_member_id)?;
    let responses = db::responses_by_question(ctx.conn, &question.id)?;
    let question = enrich(ctx, question)?;
    Ok(Some(QuestionDetail {
        question,
        member,
        responses,
    }))
}

fn encode_cursor(session_date: i64, id: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{session_date}:{id}"))
}

fn decode_cursor(cursor: &str) -> Result<(i64, String)> {
    let invalid = || CouncilError::validation("malformed cursor");
    let bytes = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    let (date, id) = text.split_once(':').ok_or_else(invalid)?;
    let date = date.parse::<i64>().map_err(|_| invalid())?;
    Ok((date, id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_survives_ids_with_colons() {
        let cursor = encode_cursor(-5, "a:b");
        assert_eq!(decode_cursor(&cursor).expect("decode"), (-5, "a:b".to_string()));
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(decode_cursor("%%%"), Err(CouncilError::Validation(_))));
        let no_separator = URL_SAFE_NO_PAD.encode("12345");
        assert!(decode_cursor(&no_separator).is_err());
    }
}
