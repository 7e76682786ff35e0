//! HTTP route handlers.
//!
//! Each submodule defines routes for a feature area:
//! - `ingest`: POST /api/ingest (rate limited)
//! - `download`: GET /api/download/file/{ingest_id}
//! - `health`: GET /health, HEAD /
//! - `assets`: GET /robots.txt, GET /llm.txt from embedded static files

pub mod assets;
pub mod download;
pub mod health;
pub mod ingest;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::middleware::{trusted_host, AllowedHosts};
use crate::processor::{QueryProcessor, SharedProcessor};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub processor: SharedProcessor,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        Self {
            processor: Arc::new(QueryProcessor::new(settings.clone())),
            settings,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let allowed_hosts = Arc::new(AllowedHosts::new(&state.settings.server.allowed_hosts));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(ingest::routes(state.clone()))
        .merge(download::routes(state.clone()))
        .merge(health::routes())
        .merge(assets::routes())
        .layer(middleware::from_fn_with_state(allowed_hosts, trusted_host))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
