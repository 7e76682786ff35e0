//! Turning user input into an `IngestionQuery`.
//!
//! - `remote`: URL/slug parsing, known hosts, ref path resolution
//! - `patterns`: include/exclude glob handling and default ignores
//!
//! Remote sources are resolved in two steps: `parse_query` builds the query
//! with an unresolved `RefPath`, and the processor fills in revision and
//! subpath once the remote's branches are known.

pub mod patterns;
pub mod remote;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::MAX_SLIDER_POSITION;
use crate::error::{AppError, Result};
use crate::models::PatternType;

pub use patterns::{build_filters, parse_patterns, PatternSet, DEFAULT_IGNORE_PATTERNS};
pub use remote::{parse_remote, resolve_ref_path, RefPath, RemoteRefs, Revision};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote {
        url: String,
        host: String,
        user_name: String,
        repo_name: String,
    },
    Local {
        path: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct IngestionQuery {
    pub id: Uuid,
    pub source: Source,
    pub slug: String,
    /// Root of the files to walk: clone destination or the local directory.
    pub local_path: PathBuf,
    /// Always starts with `/`.
    pub subpath: String,
    pub revision: Revision,
    /// Per-file byte limit.
    pub max_file_size: u64,
    pub ignore_patterns: BTreeSet<String>,
    pub include_patterns: Option<BTreeSet<String>>,
}

impl IngestionQuery {
    pub fn url(&self) -> String {
        match &self.source {
            Source::Remote { url, .. } => url.clone(),
            Source::Local { path } => path.to_string_lossy().to_string(),
        }
    }

    /// `user/repo` for remotes, the slug for local directories.
    pub fn short_url(&self) -> String {
        match &self.source {
            Source::Remote {
                user_name,
                repo_name,
                ..
            } => format!("{}/{}", user_name, repo_name),
            Source::Local { .. } => self.slug.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.source, Source::Remote { .. })
    }

    /// Directory (or file) the walk starts from.
    pub fn target_path(&self) -> PathBuf {
        let sub = self.subpath.trim_start_matches('/');
        if sub.is_empty() {
            self.local_path.clone()
        } else {
            self.local_path.join(sub)
        }
    }
}

/// What to ingest and how, independent of the caller (HTTP form or CLI).
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub source: String,
    pub max_file_size: u64,
    pub include_patterns: BTreeSet<String>,
    pub exclude_patterns: BTreeSet<String>,
    /// Overrides any branch found in the URL.
    pub branch: Option<String>,
    pub token: Option<String>,
}

impl IngestOptions {
    /// Options for a web request: slider position plus a single pattern string.
    pub fn from_web(
        source: &str,
        slider_position: u16,
        pattern_type: PatternType,
        pattern: &str,
        token: Option<String>,
    ) -> Result<Self> {
        let patterns = parse_patterns(pattern)?;
        let (include_patterns, exclude_patterns) = match pattern_type {
            PatternType::Include => (patterns, BTreeSet::new()),
            PatternType::Exclude => (BTreeSet::new(), patterns),
        };

        Ok(Self {
            source: source.to_string(),
            max_file_size: log_slider_to_size(slider_position),
            include_patterns,
            exclude_patterns,
            branch: None,
            token,
        })
    }
}

/// Map a 0-500 slider position to a byte limit, logarithmically from 1 KiB to 100 MiB.
pub fn log_slider_to_size(position: u16) -> u64 {
    let max_position = f64::from(MAX_SLIDER_POSITION);
    let min_value = 1f64.ln();
    let max_value = 102_400f64.ln();
    let fraction = (f64::from(position.min(MAX_SLIDER_POSITION)) / max_position).powf(1.5);
    let kib = (min_value + (max_value - min_value) * fraction).exp().round() as u64;
    kib * 1024
}

/// Build a query. Remote ref paths come back unresolved alongside it.
pub fn parse_query(
    options: &IngestOptions,
    tmp_dir: &Path,
    allow_local: bool,
) -> Result<(IngestionQuery, Option<RefPath>)> {
    let id = Uuid::new_v4();
    let (ignore_patterns, include_patterns) = build_filters(
        options.include_patterns.clone(),
        options.exclude_patterns.clone(),
    );

    let local_dir = Path::new(options.source.trim());
    if allow_local && !options.source.trim().is_empty() && local_dir.is_dir() {
        let path = local_dir
            .canonicalize()
            .map_err(|_| AppError::PathNotFound(options.source.clone()))?;
        let slug = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());

        let query = IngestionQuery {
            id,
            source: Source::Local { path: path.clone() },
            slug,
            local_path: path,
            subpath: "/".to_string(),
            revision: Revision::Default,
            max_file_size: options.max_file_size,
            ignore_patterns,
            include_patterns,
        };
        return Ok((query, None));
    }

    let remote = parse_remote(&options.source)?;
    let slug = remote.slug();
    let revision = options
        .branch
        .clone()
        .map(Revision::Branch)
        .unwrap_or_default();

    let query = IngestionQuery {
        id,
        local_path: tmp_dir.join(id.to_string()).join(&slug),
        slug,
        subpath: "/".to_string(),
        revision,
        max_file_size: options.max_file_size,
        ignore_patterns,
        include_patterns,
        source: Source::Remote {
            url: remote.url,
            host: remote.host,
            user_name: remote.user_name,
            repo_name: remote.repo_name,
        },
    };

    Ok((query, remote.ref_path))
}

/// Apply a resolved ref path; an explicit branch option keeps precedence.
pub fn apply_ref_path(query: &mut IngestionQuery, ref_path: &RefPath, refs: &RemoteRefs) {
    let (revision, subpath) = resolve_ref_path(ref_path, refs);
    if query.revision == Revision::Default {
        query.revision = revision;
    }
    query.subpath = subpath;
}
