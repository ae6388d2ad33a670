use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use council_core::config::AppConfig;
use council_core::identity::{Identity, SessionIdentity};
use council_core::media::{BlobStore, LocalBlobStore};
use council_core::query::QueryContext;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::error::AppError;

/// Shared handler state. The connection lock is only taken inside
/// `spawn_blocking` and never held across an `.await`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn Identity>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let blobs = LocalBlobStore::new(config.storage.public_base_url.clone());
        Self {
            db: Arc::new(Mutex::new(conn)),
            blobs: Arc::new(blobs),
            identity: Arc::new(SessionIdentity),
            config: Arc::new(config),
        }
    }

    pub fn open(config: AppConfig) -> anyhow::Result<Self> {
        let conn = council_core::db::open(&config.database.path)?;
        Ok(Self::new(conn, config))
    }

    /// Runs `f` against the shared connection on the blocking pool, so a
    /// slow statement never stalls the async workers.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection, &dyn BlobStore) -> council_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let blobs = Arc::clone(&self.blobs);
        let value = tokio::task::spawn_blocking(move || {
            let conn = db.lock();
            f(&conn, blobs.as_ref())
        })
        .await??;
        Ok(value)
    }

    pub async fn query<T, F>(&self, caller: &Caller, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&QueryContext<'_>) -> council_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let caller = caller.0.clone();
        self.with_conn(move |conn, blobs| f(&QueryContext::new(conn, blobs, caller.as_deref())))
            .await
    }
}

/// The signed-in user behind a request, if any. Unknown or expired tokens
/// resolve to an anonymous caller; guarded operations reject those later.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<String>);

impl Caller {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        let Some(token) = token else {
            return Ok(Caller(None));
        };
        let identity = Arc::clone(&state.identity);
        let user_id = state
            .with_conn(move |conn, _| identity.caller_for_token(conn, &token))
            .await?;
        Ok(Caller(user_id))
    }
}
