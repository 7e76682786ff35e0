//! Data transfer objects and in-memory tree types.
//!
//! - `ingest`: IngestForm, IngestRequest, PatternType and the two response shapes
//! - `tree`: FileSystemNode and NodeType produced by the ingestion walk

pub mod ingest;
pub mod tree;

pub use ingest::*;
pub use tree::*;
