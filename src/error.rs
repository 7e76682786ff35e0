//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` for every failure in the ingestion pipeline and the
//! `ErrorKind` classification the ingest endpoint uses to shape its error
//! body. Implements Axum's `IntoResponse` for the remaining endpoints, which
//! answer with a plain `{"error": ...}` JSON body.
//!
//! Kind mappings:
//! - `Validation` → 400, reported as `Validation error: ...`
//! - `Processing` (bad locator, unreachable repo, clone/git failures) → 400
//! - `NotFound` (unknown ingest id) → 404
//! - `Internal` (I/O on scratch space, poisoned locks, task panics) → 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid repository URL '{0}'")]
    InvalidRepoUrl(String),

    #[error("Unknown domain '{0}' in URL")]
    UnknownHost(String),

    #[error("Invalid URL scheme '{0}' in URL")]
    InvalidScheme(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(
        "Pattern '{0}' contains invalid characters. Only alphanumeric characters, dash (-), \
         underscore (_), dot (.), forward slash (/), plus (+), and asterisk (*) are allowed."
    )]
    InvalidPattern(String),

    #[error("Repository not found or not accessible: {0}")]
    RepoNotFound(String),

    #[error("{0} cannot be found")]
    PathNotFound(String),

    #[error("{0} is filtered out by the ignore patterns, include patterns or size limit")]
    TargetFiltered(String),

    #[error("Repository clone timed out after {0} seconds")]
    CloneTimeout(u64),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Ingest not found: {0}")]
    IngestNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

/// Coarse classification used to pick a status code and message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Processing,
    NotFound,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::InvalidRepoUrl(_)
            | AppError::UnknownHost(_)
            | AppError::InvalidScheme(_)
            | AppError::Url(_)
            | AppError::InvalidPattern(_)
            | AppError::RepoNotFound(_)
            | AppError::PathNotFound(_)
            | AppError::TargetFiltered(_)
            | AppError::CloneTimeout(_)
            | AppError::Git(_) => ErrorKind::Processing,
            AppError::IngestNotFound(_) => ErrorKind::NotFound,
            AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::Processing => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message reported to API clients, prefixed according to the kind.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound => self.to_string(),
            ErrorKind::Processing => format!("Error: {}", self),
            ErrorKind::Internal => format!("Internal server error: {}", self),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.kind() == ErrorKind::Internal {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.client_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
