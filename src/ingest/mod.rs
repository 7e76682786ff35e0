//! Walking a checked-out tree and rendering the digest.
//!
//! - `walker`: filtered filesystem walk into a `FileSystemNode` tree
//! - `output`: summary, tree diagram and content blocks

pub mod output;
pub mod walker;

pub use output::{estimate_tokens, format_digest, format_token_count, Digest};
pub use walker::{walk, IngestLimits};

use crate::error::Result;
use crate::query::IngestionQuery;

/// Walk the query's target and render it.
pub fn ingest_query(query: &IngestionQuery, limits: IngestLimits) -> Result<Digest> {
    let root = walk(query, limits)?;
    if root.is_dir() && root.file_count == 0 {
        tracing::info!("No files matched for {}", query.slug);
    }
    Ok(format_digest(query, &root))
}
