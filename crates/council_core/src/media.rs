//! Blob storage collaborator for member photos, news thumbnails and slide
//! images.

use crate::auth::require_admin;
use crate::db::new_id;
use crate::error::Result;
use rusqlite::Connection;

/// Issues upload targets and turns stored object ids into fetchable URLs.
pub trait BlobStore: Send + Sync {
    fn upload_url(&self) -> Result<String>;
    fn resolve(&self, storage_id: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self { public_base_url }
    }
}

impl BlobStore for LocalBlobStore {
    fn upload_url(&self) -> Result<String> {
        Ok(format!("{}/upload/{}", self.public_base_url, new_id()))
    }

    fn resolve(&self, storage_id: &str) -> Option<String> {
        let storage_id = storage_id.trim();
        if storage_id.is_empty() {
            return None;
        }
        Some(format!("{}/files/{storage_id}", self.public_base_url))
    }
}

/// A storage reference wins over a direct URL when both are set.
pub fn resolve_image(
    blobs: &dyn BlobStore,
    direct_url: Option<String>,
    storage_id: Option<&str>,
) -> Option<String> {
    storage_id
        .and_then(|storage_id| blobs.resolve(storage_id))
        .or(direct_url)
}

/// Admin-only: hands out a one-shot upload target.
pub fn generate_upload_url(
    conn: &Connection,
    blobs: &dyn BlobStore,
    caller: Option<&str>,
) -> Result<String> {
    let admin = require_admin(conn, caller)?;
    let url = blobs.upload_url()?;
    tracing::info!(user_id = %admin.user_id, "issued upload url");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_reference_takes_priority_over_direct_url() {
        let blobs = LocalBlobStore::new("https://cdn.example.jp/");
        let resolved = resolve_image(
            &blobs,
            Some("https://elsewhere.example.jp/a.png".to_string()),
            Some("abc"),
        );
        assert_eq!(resolved.as_deref(), Some("https://cdn.example.jp/files/abc"));

        let fallback = resolve_image(&blobs, Some("https://x/a.png".to_string()), None);
        assert_eq!(fallback.as_deref(), Some("https://x/a.png"));

        assert_eq!(resolve_image(&blobs, None, Some("  ")), None);
    }

    #[test]
    fn upload_urls_are_unique() {
        let blobs = LocalBlobStore::new("https://cdn.example.jp");
        let a = blobs.upload_url().expect("url");
        let b = blobs.upload_url().expect("url");
        assert!(a.starts_with("https://cdn.example.jp/upload/"));
        assert_ne!(a, b);
    }
}
