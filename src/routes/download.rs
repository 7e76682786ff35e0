//! Full digest download.
//!
//! GET /api/download/file/{ingest_id}
//!   Returns the uncropped digest of a recent ingest as a text attachment.
//!   Unknown or expired ids answer 404.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/download/file/{ingest_id}", get(download_digest))
        .with_state(state)
}

async fn download_digest(
    State(state): State<AppState>,
    Path(ingest_id): Path<String>,
) -> Result<Response> {
    let id: Uuid = ingest_id
        .parse()
        .map_err(|_| AppError::IngestNotFound(ingest_id.clone()))?;

    let digest = state
        .processor
        .cache()
        .get(&id)?
        .ok_or(AppError::IngestNotFound(ingest_id))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.txt\"", digest.slug),
            ),
        ],
        digest.text,
    )
        .into_response())
}
