use axum::{
    http::header,
    response::IntoResponse,
    routing::{get, head},
    Json, Router,
};
use serde_json::{json, Value};

pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", head(head_root))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Mirrors the headers of an HTML index page without a body.
async fn head_root() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], ())
}
