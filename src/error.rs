use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate item: {0}")]
    Duplicate(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Duplicate(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Errors returned by the per-video source fetchers.
///
/// `NotFound` and `TranscriptUnavailable` mean "this source has nothing for
/// the item"; the remaining variants are transport or upstream failures. The
/// item processor treats all of them as an absent source except for metadata.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Captions unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl FetchError {
    /// True when the source simply has no data for the item
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound(_) | FetchError::TranscriptUnavailable(_)
        )
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(what) => AppError::NotFound(what),
            FetchError::HttpClient(e) => AppError::HttpClient(e),
            other => AppError::ExternalApi(other.to_string()),
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
