use crate::auth::require_admin;
use crate::db::{new_id, now_ms, sql_limit};
use crate::error::{CouncilError, Result};
use crate::media::{BlobStore, resolve_image};
use crate::questions::require_text;
use crate::schema::{Id, News, clearable};
use rusqlite::{params, Connection, OptionalExtension, Row};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECENT_NEWS_LIMIT: usize = 5;

const NEWS_COLUMNS: &str = "id, title, content, category, published_at, is_published, \
     thumbnail_url, thumbnail_storage_id, author_id, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsInput {
    pub title: String,
    pub content: String,
    pub category: String,
    pub published_at: Option<i64>,
    #[serde(default)]
    pub is_published: bool,
    pub thumbnail_url: Option<String>,
    pub thumbnail_storage_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub published_at: Option<i64>,
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub thumbnail_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub thumbnail_storage_id: Option<Option<String>>,
}

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<News> {
    Ok(News {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        published_at: row.get(4)?,
        is_published: row.get(5)?,
        thumbnail_url: row.get(6)?,
        thumbnail_storage_id: row.get(7)?,
        author_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn with_thumbnail(blobs: &dyn BlobStore, mut news: News) -> News {
    news.thumbnail_url = resolve_image(
        blobs,
        news.thumbnail_url.take(),
        news.thumbnail_storage_id.as_deref(),
    );
    news
}

fn query_news(conn: &Connection, sql: &str, limit: Option<usize>) -> Result<Vec<News>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = match limit {
        Some(limit) => stmt.query_map(params![sql_limit(limit)], news_from_row)?,
        None => stmt.query_map([], news_from_row)?,
    };
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn find_news(conn: &Connection, id: &str) -> Result<Option<News>> {
    let sql = format!("SELECT {NEWS_COLUMNS} FROM news WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], news_from_row).optional()?)
}

pub fn list_published_news(conn: &Connection, blobs: &dyn BlobStore) -> Result<Vec<News>> {
    let sql = format!(
        "SELECT {NEWS_COLUMNS} FROM news WHERE is_published = 1 ORDER BY published_at DESC, id DESC"
    );
    Ok(query_news(conn, &sql, None)?
        .into_iter()
        .map(|news| with_thumbnail(blobs, news))
        .collect())
}

pub fn get_recent_news(conn: &Connection, blobs: &dyn BlobStore, limit: Option<usize>) -> Result<Vec<News>> {
    let sql = format!(
        "SELECT {NEWS_COLUMNS} FROM news WHERE is_published = 1 ORDER BY published_at DESC, id DESC LIMIT ?1"
    );
    let limit = limit.unwrap_or(DEFAULT_RECENT_NEWS_LIMIT);
    Ok(query_news(conn, &sql, Some(limit))?
        .into_iter()
        .map(|news| with_thumbnail(blobs, news))
        .collect())
}

/// `None` for missing and for unpublished items alike.
pub fn get_news_by_id(conn: &Connection, blobs: &dyn BlobStore, id: &str) -> Result<Option<News>> {
    Ok(find_news(conn, id)?
        .filter(|news| news.is_published)
        .map(|news| with_thumbnail(blobs, news)))
}

pub fn list_all_news(conn: &Connection, blobs: &dyn BlobStore, caller: Option<&str>) -> Result<Vec<News>> {
    require_admin(conn, caller)?;
    let sql = format!("SELECT {NEWS_COLUMNS} FROM news ORDER BY published_at DESC, id DESC");
    Ok(query_news(conn, &sql, None)?
        .into_iter()
        .map(|news| with_thumbnail(blobs, news))
        .collect())
}

pub fn create_news(conn: &Connection, caller: Option<&str>, input: NewsInput) -> Result<Id> {
    let admin = require_admin(conn, caller)?;
    let now = now_ms();
    let news = News {
        id: new_id(),
        title: require_text(&input.title, "title")?,
        content: require_text(&input.content, "content")?,
        category: require_text(&input.category, "category")?,
        published_at: input.published_at.unwrap_or(now),
        is_published: input.is_published,
        thumbnail_url: input.thumbnail_url,
        thumbnail_storage_id: input.thumbnail_storage_id,
        author_id: admin.user_id,
        created_at: now,
        updated_at: now,
    };
    write_news(conn, &news)?;
    tracing::info!(news_id = %news.id, published = news.is_published, "created news");
    Ok(news.id)
}

pub fn update_news(conn: &Connection, caller: Option<&str>, id: &str, patch: NewsPatch) -> Result<News> {
    require_admin(conn, caller)?;
    let mut news = find_news(conn, id)?.ok_or(CouncilError::NotFound("news"))?;

    if let Some(title) = patch.title {
        news.title = require_text(&title, "title")?;
    }
    if let Some(content) = patch.content {
        news.content = require_text(&content, "content")?;
    }
    if let Some(category) = patch.category {
        news.category = require_text(&category, "category")?;
    }
    if let Some(published_at) = patch.published_at {
        news.published_at = published_at;
    }
    if let Some(is_published) = patch.is_published {
        news.is_published = is_published;
    }
    if let Some(thumbnail_url) = patch.thumbnail_url {
        news.thumbnail_url = thumbnail_url;
    }
    if let Some(thumbnail_storage_id) = patch.thumbnail_storage_id {
        news.thumbnail_storage_id = thumbnail_storage_id;
    }
    news.updated_at = now_ms();

    write_news(conn, &news)?;
    tracing::info!(news_id = %news.id, published = news.is_published, "updated news");
    Ok(news)
}

pub fn delete_news(conn: &Connection, caller: Option<&str>, id: &str) -> Result<()> {
    require_admin(conn, caller)?;
    if conn.execute("DELETE FROM news WHERE id = ?1", params![id])? == 0 {
        return Err(CouncilError::NotFound("news"));
    }
    tracing::info!(news_id = id, "deleted news");
    Ok(())
}

pub(crate) fn write_news(conn: &Connection, news: &News) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO news (
          id, title, content, category, published_at, is_published,
          thumbnail_url, thumbnail_storage_id, author_id, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
          title=excluded.title,
          content=excluded.content,
          category=excluded.category,
          published_at=excluded.published_at,
          is_published=excluded.is_published,
          thumbnail_url=excluded.thumbnail_url,
          thumbnail_storage_id=excluded.thumbnail_storage_id,
          updated_at=excluded.updated_at
        "#,
        params![
            news.id,
            news.title,
            news.content,
            news.category,
            news.published_at,
            news.is_published,
            news.thumbnail_url,
            news.thumbnail_storage_id,
            news.author_id,
            news.created_at,
            news.updated_at
        ],
    )?;
    Ok(())
}
