use crate::auth::require_admin;
use crate::db::new_id;
use crate::error::{CouncilError, Result};
use crate::questions::require_text;
use crate::schema::{Faq, FaqGroup, Id};
use rusqlite::{params, Connection, OptionalExtension, Row};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const FAQ_COLUMNS: &str = "id, category, question, answer, sort_order, is_published";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqInput {
    pub category: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqPatch {
    pub category: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub order: Option<i64>,
    pub is_published: Option<bool>,
}

fn faq_from_row(row: &Row<'_>) -> rusqlite::Result<Faq> {
    Ok(Faq {
        id: row.get(0)?,
        category: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        order: row.get(4)?,
        is_published: row.get(5)?,
    })
}

/// Published FAQs grouped by category; groups appear in the order their
/// first item sorts.
pub fn list_faqs(conn: &Connection) -> Result<Vec<FaqGroup>> {
    let sql = format!(
        "SELECT {FAQ_COLUMNS} FROM faqs WHERE is_published = 1 ORDER BY sort_order ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map([], faq_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(group_by_category(items))
}

fn group_by_category(items: Vec<Faq>) -> Vec<FaqGroup> {
    let mut groups: Vec<FaqGroup> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|group| group.category == item.category) {
            Some(group) => group.items.push(item),
            None => groups.push(FaqGroup {
                category: item.category.clone(),
                items: vec![item],
            }),
        }
    }
    groups
}

fn find_faq(conn: &Connection, id: &str) -> Result<Option<Faq>> {
    let sql = format!("SELECT {FAQ_COLUMNS} FROM faqs WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], faq_from_row).optional()?)
}

pub fn create_faq(conn: &Connection, caller: Option<&str>, input: FaqInput) -> Result<Id> {
    require_admin(conn, caller)?;
    let faq = Faq {
        id: new_id(),
        category: require_text(&input.category, "category")?,
        question: require_text(&input.question, "question")?,
        answer: require_text(&input.answer, "answer")?,
        order: input.order,
        is_published: input.is_published,
    };
    write_faq(conn, &faq)?;
    tracing::info!(faq_id = %faq.id, category = %faq.category, "created faq");
    Ok(faq.id)
}

pub fn update_faq(conn: &Connection, caller: Option<&str>, id: &str, patch: FaqPatch) -> Result<Faq> {
    require_admin(conn, caller)?;
    let mut faq = find_faq(conn, id)?.ok_or(CouncilError::NotFound("faq"))?;

    if let Some(category) = patch.category {
        faq.category = require_text(&category, "category")?;
    }
    if let Some(question) = patch.question {
        faq.question = require_text(&question, "question")?;
    }
    if let Some(answer) = patch.answer {
        faq.answer = require_text(&answer, "answer")?;
    }
    if let Some(order) = patch.order {
        faq.order = order;
    }
    if let Some(is_published) = patch.is_published {
        faq.is_published = is_published;
    }

    write_faq(conn, &faq)?;
    tracing::info!(faq_id = %faq.id, "updated faq");
    Ok(faq)
}

pub fn delete_faq(conn: &Connection, caller: Option<&str>, id: &str) -> Result<()> {
    require_admin(conn, caller)?;
    if conn.execute("DELETE FROM faqs WHERE id = ?1", params![id])? == 0 {
        return Err(CouncilError::NotFound("faq"));
    }
    tracing::info!(faq_id = id, "deleted faq");
    Ok(())
}

pub(crate) fn write_faq(conn: &Connection, faq: &Faq) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO faqs (id, category, question, answer, sort_order, is_published)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
          category=excluded.category,
          question=excluded.question,
          answer=excluded.answer,
          sort_order=excluded.sort_order,
          is_published=excluded.is_published
        "#,
        params![
            faq.id,
            faq.category,
            faq.question,
            faq.answer,
            faq.order,
            faq.is_published
        ],
    )?;
    Ok(())
}
