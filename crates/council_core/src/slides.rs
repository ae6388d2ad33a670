use crate::auth::require_admin;
use crate::db::{new_id, now_ms};
use crate::error::{CouncilError, Result};
use crate::media::{BlobStore, resolve_image};
use crate::questions::require_text;
use crate::schema::{Id, SlideshowSlide, clearable};
use rusqlite::{params, Connection, OptionalExtension, Row};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const SLIDE_COLUMNS: &str = "id, title, description, image_url, image_storage_id, link_url, \
     background_color, is_active, sort_order, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlideInput {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_storage_id: Option<String>,
    pub link_url: Option<String>,
    pub background_color: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub order: i64,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlidePatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub image_storage_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub link_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub background_color: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub order: Option<i64>,
}

fn slide_from_row(row: &Row<'_>) -> rusqlite::Result<SlideshowSlide> {
    Ok(SlideshowSlide {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        image_storage_id: row.get(4)?,
        link_url: row.get(5)?,
        background_color: row.get(6)?,
        is_active: row.get(7)?,
        order: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Active slides in display order, each image resolved to a URL.
pub fn list_active_slides(conn: &Connection, blobs: &dyn BlobStore) -> Result<Vec<SlideshowSlide>> {
    let sql = format!(
        "SELECT {SLIDE_COLUMNS} FROM slides WHERE is_active = 1 ORDER BY sort_order ASC, created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let slides = stmt
        .query_map([], slide_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(slides
        .into_iter()
        .map(|mut slide| {
            slide.image_url =
                resolve_image(blobs, slide.image_url.take(), slide.image_storage_id.as_deref());
            slide
        })
        .collect())
}

fn find_slide(conn: &Connection, id: &str) -> Result<Option<SlideshowSlide>> {
    let sql = format!("SELECT {SLIDE_COLUMNS} FROM slides WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], slide_from_row).optional()?)
}

pub fn create_slide(conn: &Connection, caller: Option<&str>, input: SlideInput) -> Result<Id> {
    require_admin(conn, caller)?;
    let slide = SlideshowSlide {
        id: new_id(),
        title: require_text(&input.title, "title")?,
        description: input.description,
        image_url: input.image_url,
        image_storage_id: input.image_storage_id,
        link_url: input.link_url,
        background_color: input.background_color,
        is_active: input.is_active,
        order: input.order,
        created_at: now_ms(),
    };
    write_slide(conn, &slide)?;
    tracing::info!(slide_id = %slide.id, order = slide.order, "created slide");
    Ok(slide.id)
}

pub fn update_slide(
    conn: &Connection,
    caller: Option<&str>,
    id: &str,
    patch: SlidePatch,
) -> Result<SlideshowSlide> {
    require_admin(conn, caller)?;
    let mut slide = find_slide(conn, id)?.ok_or(CouncilError::NotFound("slide"))?;

    if let Some(title) = patch.title {
        slide.title = require_text(&title, "title")?;
    }
    if let Some(is_active) = patch.is_active {
        slide.is_active = is_active;
    }
    if let Some(order) = patch.order {
        slide.order = order;
    }
    if let Some(description) = patch.description {
        slide.description = description;
    }
    if let Some(image_url) = patch.image_url {
        slide.image_url = image_url;
    }
    if let Some(image_storage_id) = patch.image_storage_id {
        slide.image_storage_id = image_storage_id;
    }
    if let Some(link_url) = patch.link_url {
        slide.link_url = link_url;
    }
    if let Some(background_color) = patch.background_color {
        slide.background_color = background_color;
    }

    write_slide(conn, &slide)?;
    tracing::info!(slide_id = %slide.id, "updated slide");
    Ok(slide)
}

pub fn delete_slide(conn: &Connection, caller: Option<&str>, id: &str) -> Result<()> {
    require_admin(conn, caller)?;
    if conn.execute("DELETE FROM slides WHERE id = ?1", params![id])? == 0 {
        return Err(CouncilError::NotFound("slide"));
    }
    tracing::info!(slide_id = id, "deleted slide");
    Ok(())
}

pub(crate) fn write_slide(conn: &Connection, slide: &SlideshowSlide) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO slides (
          id, title, description, image_url, image_storage_id, link_url,
          background_color, is_active, sort_order, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
          title=excluded.title,
          description=excluded.description,
          image_url=excluded.image_url,
          image_storage_id=excluded.image_storage_id,
          link_url=excluded.link_url,
          background_color=excluded.background_color,
          is_active=excluded.is_active,
          sort_order=excluded.sort_order
        "#,
        params![
            slide.id,
            slide.title,
            slide.description,
            slide.image_url,
            slide.image_storage_id,
            slide.link_url,
            slide.background_color,
            slide.is_active,
            slide.order,
            slide.created_at
        ],
    )?;
    Ok(())
}
