//! gitingest - turn a Git repository into a text digest for language models.
//!
//! - `query`: parse repository locators and filter patterns
//! - `git`: ls-remote and clone via libgit2
//! - `ingest`: walk the checked-out tree and render the digest
//! - `processor`: the end-to-end pipeline shared by HTTP and CLI
//! - `routes` / `middleware`: the axum service

pub mod cache;
pub mod config;
pub mod error;
pub mod git;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod processor;
pub mod query;
pub mod routes;

pub use config::Settings;
pub use error::{AppError, Result};
pub use processor::{IngestOutcome, QueryProcessor};
pub use routes::{create_router, AppState};
