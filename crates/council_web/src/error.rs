use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use council_core::CouncilError;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Council(#[from] CouncilError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Council(err) => match err {
                CouncilError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
                CouncilError::AuthorizationDenied => StatusCode::FORBIDDEN,
                CouncilError::NotFound(_) => StatusCode::NOT_FOUND,
                CouncilError::Validation(_) => StatusCode::BAD_REQUEST,
                CouncilError::Sql(_) | CouncilError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            return (status, "Internal error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}
