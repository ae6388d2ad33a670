use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "council.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080/storage".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListingConfig {
    pub default_page_size: usize,
    pub recent_news_limit: usize,
    pub top_liked_limit: usize,
    pub session_ttl_hours: i64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: crate::query::DEFAULT_PAGE_SIZE,
            recent_news_limit: crate::news::DEFAULT_RECENT_NEWS_LIMIT,
            top_liked_limit: crate::query::DEFAULT_TOP_LIKED_LIMIT,
            session_ttl_hours: 24 * 30,
        }
    }
}

impl AppConfig {
    /// Reads `path` as TOML; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9000

            [listing]
            default_page_size = 50
            "#,
        )
        .expect("parse");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.listing.default_page_size, 50);
        assert_eq!(config.listing.top_liked_limit, 10);
        assert_eq!(config.database.path, "council.db");
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/council.toml")).expect("load");
        assert_eq!(config, AppConfig::default());
    }
}
