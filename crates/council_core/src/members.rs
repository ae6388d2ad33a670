use crate::auth::require_admin;
use crate::db::{self, new_id, now_ms};
use crate::error::{CouncilError, Result};
use crate::filter::compare_titles;
use crate::media::{BlobStore, resolve_image};
use crate::schema::{CouncilMember, Id, clearable};
use rusqlite::{Connection, params};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    pub name: String,
    pub party: Option<String>,
    pub position: Option<String>,
    pub term_start: Option<i64>,
    pub term_end: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub photo_storage_id: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub party: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub position: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<i64>")]
    pub term_start: Option<Option<i64>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<i64>")]
    pub term_end: Option<Option<i64>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub photo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub photo_storage_id: Option<Option<String>>,
}

fn with_photo(blobs: &dyn BlobStore, mut member: CouncilMember) -> CouncilMember {
    member.photo_url = resolve_image(blobs, member.photo_url.take(), member.photo_storage_id.as_deref());
    member
}

/// Members ordered by name, photos resolved to fetchable URLs.
pub fn list_members(
    conn: &Connection,
    blobs: &dyn BlobStore,
    active_only: bool,
) -> Result<Vec<CouncilMember>> {
    let mut members: Vec<CouncilMember> = db::all_members(conn)?
        .into_iter()
        .filter(|member| !active_only || member.is_active)
        .map(|member| with_photo(blobs, member))
        .collect();
    members.sort_by(|a, b| compare_titles(&a.name, &b.name));
    Ok(members)
}

pub fn get_member(conn: &Connection, blobs: &dyn BlobStore, id: &str) -> Result<Option<CouncilMember>> {
    Ok(db::get_member(conn, id)?.map(|member| with_photo(blobs, member)))
}

pub fn create_member(conn: &Connection, caller: Option<&str>, input: MemberInput) -> Result<Id> {
    require_admin(conn, caller)?;
    if input.name.trim().is_empty() {
        return Err(CouncilError::validation("name is required"));
    }

    let member = CouncilMember {
        id: new_id(),
        name: input.name.trim().to_string(),
        party: input.party,
        position: input.position,
        term_start: input.term_start,
        term_end: input.term_end,
        is_active: input.is_active,
        email: input.email,
        phone: input.phone,
        website: input.website,
        bio: input.bio,
        photo_url: input.photo_url,
        photo_storage_id: input.photo_storage_id,
        created_at: now_ms(),
    };
    write_member(conn, &member)?;
    tracing::info!(member_id = %member.id, "created council member");
    Ok(member.id)
}

pub fn update_member(
    conn: &Connection,
    caller: Option<&str>,
    id: &str,
    patch: MemberPatch,
) -> Result<CouncilMember> {
    require_admin(conn, caller)?;
    let mut member = db::get_member(conn, id)?.ok_or(CouncilError::NotFound("council member"))?;

    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(CouncilError::validation("name is required"));
        }
        member.name = name.trim().to_string();
    }
    if let Some(is_active) = patch.is_active {
        member.is_active = is_active;
    }
    if let Some(party) = patch.party {
        member.party = party;
    }
    if let Some(position) = patch.position {
        member.position = position;
    }
    if let Some(term_start) = patch.term_start {
        member.term_start = term_start;
    }
    if let Some(term_end) = patch.term_end {
        member.term_end = term_end;
    }
    if let Some(email) = patch.email {
        member.email = email;
    }
    if let Some(phone) = patch.phone {
        member.phone = phone;
    }
    if let Some(website) = patch.website {
        member.website = website;
    }
    if let Some(bio) = patch.bio {
        member.bio = bio;
    }
    if let Some(photo_url) = patch.photo_url {
        member.photo_url = photo_url;
    }
    if let Some(photo_storage_id) = patch.photo_storage_id {
        member.photo_storage_id = photo_storage_id;
    }

    write_member(conn, &member)?;
    tracing::info!(member_id = %member.id, "updated council member");
    Ok(member)
}

pub(crate) fn write_member(conn: &Connection, member: &CouncilMember) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO council_members (
          id, name, party, position, term_start, term_end, is_active,
          email, phone, website, bio, photo_url, photo_storage_id, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT(id) DO UPDATE SET
          name=excluded.name,
          party=excluded.party,
          position=excluded.position,
          term_start=excluded.term_start,
          term_end=excluded.term_end,
          is_active=excluded.is_active,
          email=excluded.email,
          phone=excluded.phone,
          website=excluded.website,
          bio=excluded.bio,
          photo_url=excluded.photo_url,
          photo_storage_id=excluded.photo_storage_id
        "#,
        params![
            member.id,
            member.name,
            member.party,
            member.position,
            member.term_start,
            member.term_end,
            member.is_active,
            member.email,
            member.phone,
            member.website,
            member.bio,
            member.photo_url,
            member.photo_storage_id,
            member.created_at
        ],
    )?;
    Ok(())
}
