use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid {kind} value: {value}")]
    InvalidInput { kind: &'static str, value: String },

    #[error("conflicts with an existing row")]
    Conflict,

    #[error("no matching entry")]
    NotFound,

    #[error("store unavailable: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("http client unavailable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("batch aborted after {completed} committed deletions: {cause}")]
    PartialBatchFailure {
        completed: usize,
        #[source]
        cause: rusqlite::Error,
    },

    #[error("source '{name}' unreadable: {detail}")]
    Source { name: String, detail: String },
}

/// True when the underlying SQLite error is a UNIQUE constraint violation,
/// which ingestion and the reporter treat as "already exists" rather than
/// a fatal error.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::InvalidInput { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Conflict => (StatusCode::CONFLICT, self.to_string()),
            _ => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
