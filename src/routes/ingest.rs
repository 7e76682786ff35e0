//! Repository ingestion endpoint.
//!
//! POST /api/ingest (application/x-www-form-urlencoded)
//!   input_text, max_file_size (slider 0-500), pattern_type, pattern, token
//!
//! Answers 200 with `IngestSuccessResponse`, or `IngestErrorResponse` with
//! 400 (validation/processing), 429 (rate limited) or 500 (internal). Every
//! error body echoes the submitted fields.

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};

use crate::error::{AppError, ErrorKind};
use crate::middleware::limit_per_minute;
use crate::models::{IngestErrorResponse, IngestForm, IngestResponse, IngestSuccessResponse};
use crate::processor::crop_content;
use crate::query::IngestOptions;
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    let per_minute = state.settings.server.rate_limit_per_minute;
    let router = Router::new()
        .route("/api/ingest", post(api_ingest))
        .with_state(state);
    limit_per_minute(router, per_minute)
}

fn respond(status: StatusCode, body: IngestResponse) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(error: AppError, form: &IngestForm) -> Response {
    match error.kind() {
        ErrorKind::Internal => tracing::error!("Ingest failed: {}", error),
        _ => tracing::info!("Ingest rejected: {}", error),
    }
    let body = IngestErrorResponse::from_form(error.client_message(), form);
    respond(error.status_code(), IngestResponse::Error(body))
}

async fn api_ingest(
    State(state): State<AppState>,
    form: Result<Form<IngestForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            return error_response(
                AppError::Validation(rejection.body_text()),
                &IngestForm::default(),
            );
        }
    };

    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => return error_response(e, &form),
    };

    let options = match IngestOptions::from_web(
        &request.input_text,
        request.max_file_size,
        request.pattern_type,
        &request.pattern,
        request.token.clone(),
    ) {
        Ok(options) => options,
        Err(e) => return error_response(e, &form),
    };

    match state.processor.process(options).await {
        Ok(outcome) => {
            let content = crop_content(
                &outcome.digest.content,
                state.settings.server.max_display_size,
            );
            let body = IngestSuccessResponse {
                result: true,
                repo_url: outcome.repo_url,
                short_repo_url: outcome.short_repo_url,
                summary: outcome.digest.summary,
                tree: outcome.digest.tree,
                content,
                default_file_size: i64::from(request.max_file_size),
                pattern_type: request.pattern_type.to_string(),
                pattern: request.pattern,
                token: request.token,
                ingest_id: outcome.ingest_id,
            };
            respond(StatusCode::OK, IngestResponse::Success(body))
        }
        Err(e) => error_response(e, &form),
    }
}
