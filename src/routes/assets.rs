//! Embedded static text files.
//!
//! - GET /robots.txt: crawler directives
//! - GET /llm.txt: description of the service for language models

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    routing::get,
    Router,
};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "static/"]
struct Assets;

pub fn routes() -> Router {
    Router::new()
        .route("/robots.txt", get(|| serve_asset("robots.txt")))
        .route("/llm.txt", get(|| serve_asset("llm.txt")))
}

async fn serve_asset(path: &'static str) -> Response<Body> {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_text_plain();
            let mut response = Response::new(Body::from(content.data.into_owned()));
            if let Ok(value) = mime.as_ref().parse() {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response
        }
        None => {
            let mut response = Response::new(Body::from("Not Found"));
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
    }
}
