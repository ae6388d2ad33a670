use thiserror::Error;

pub type Result<T> = std::result::Result<T, CouncilError>;

#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("admin role required")]
    AuthorizationDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl CouncilError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
