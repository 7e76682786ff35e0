//! End-to-end query processing shared by the HTTP route and the CLI.
//!
//! parse → ls-remote + ref resolution → clone (remote only) → walk + render →
//! cache the full digest → remove scratch space.
//!
//! Blocking git and filesystem work runs on tokio's blocking pool. Remote
//! preparation (ls-remote and clone) is bounded by the clone timeout and the
//! number of in-flight ingests by a semaphore. A timed out clone is cancelled
//! and keeps its permit until the blocking task has returned and its scratch
//! directory is gone.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::cache::DigestCache;
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::git::{clone_repo, list_remote_refs, CloneRequest};
use crate::ingest::{ingest_query, Digest, IngestLimits};
use crate::query::{apply_ref_path, parse_query, IngestOptions, IngestionQuery, RefPath};

/// Result of a successful ingest.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub ingest_id: String,
    pub repo_url: String,
    pub short_repo_url: String,
    pub slug: String,
    pub digest: Digest,
}

pub struct QueryProcessor {
    settings: Arc<Settings>,
    cache: Arc<DigestCache>,
    permits: Arc<Semaphore>,
}

pub type SharedProcessor = Arc<QueryProcessor>;

impl QueryProcessor {
    pub fn new(settings: Arc<Settings>) -> Self {
        let cache = Arc::new(DigestCache::new(
            settings.cache.ttl_secs,
            settings.cache.capacity,
        ));
        let permits = Arc::new(Semaphore::new(settings.ingest.max_concurrent));
        Self {
            settings,
            cache,
            permits,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &DigestCache {
        &self.cache
    }

    fn limits(&self) -> IngestLimits {
        IngestLimits {
            max_files: self.settings.ingest.max_files,
            max_total_size: self.settings.ingest.max_total_size,
            max_depth: self.settings.ingest.max_depth,
        }
    }

    async fn admit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Ingest queue closed".to_string()))
    }

    pub async fn process(&self, options: IngestOptions) -> Result<IngestOutcome> {
        let permit = self.admit().await?;

        let (mut query, ref_path) = parse_query(
            &options,
            &self.settings.ingest.tmp_dir,
            self.settings.ingest.allow_local_sources,
        )?;
        tracing::info!(
            "Processing query {} for {} (max file size {} bytes)",
            query.id,
            query.url(),
            query.max_file_size
        );

        let (scratch, _permit) = if query.is_remote() {
            let scratch = scratch_dir(&query)?;
            let (prepared, permit) = self
                .prepare_remote(query, ref_path, options.token.clone(), permit)
                .await?;
            query = prepared;
            (Some(scratch), permit)
        } else {
            (None, permit)
        };

        let limits = self.limits();
        let walk_query = query.clone();
        let digest = tokio::task::spawn_blocking(move || ingest_query(&walk_query, limits))
            .await
            .map_err(|e| AppError::Internal(format!("Ingest task failed: {}", e)));

        if let Some(scratch) = &scratch {
            remove_scratch(scratch).await;
        }
        let digest = digest??;

        self.cache
            .insert(query.id, &query.slug, digest.full_text())?;
        let stats = self.cache.stats();
        tracing::debug!(
            "Digest cache holds {} entries ({} bytes)",
            stats.entries,
            stats.total_bytes
        );

        tracing::info!("Ingested {} as {}", query.short_url(), query.id);
        Ok(IngestOutcome {
            ingest_id: query.id.to_string(),
            repo_url: query.url(),
            short_repo_url: query.short_url(),
            slug: query.slug.clone(),
            digest,
        })
    }

    /// Resolve refs and clone, bounded by the clone timeout.
    ///
    /// The scratch directory is removed on failure. On timeout the clone is
    /// cancelled and a background task takes over `permit` and the cleanup.
    async fn prepare_remote(
        &self,
        mut query: IngestionQuery,
        ref_path: Option<RefPath>,
        token: Option<String>,
        permit: OwnedSemaphorePermit,
    ) -> Result<(IngestionQuery, OwnedSemaphorePermit)> {
        let timeout_secs = self.settings.ingest.clone_timeout_secs;
        let scratch = scratch_dir(&query)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let task_cancel = Arc::clone(&cancel);

        let mut task = tokio::task::spawn_blocking(move || -> Result<IngestionQuery> {
            let url = query.url();
            let refs = list_remote_refs(&url, token.as_deref())?;
            if let Some(ref_path) = &ref_path {
                apply_ref_path(&mut query, ref_path, &refs);
            }

            clone_repo(CloneRequest {
                url: &url,
                local_path: &query.local_path,
                revision: &query.revision,
                token: token.as_deref(),
                cancel: Some(&task_cancel),
            })?;
            Ok(query)
        });

        let deadline = Duration::from_secs(timeout_secs);
        let joined = match tokio::time::timeout(deadline, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!("Clone timed out after {} seconds, cancelling", timeout_secs);
                cancel.store(true, Ordering::Relaxed);
                tokio::spawn(async move {
                    if let Ok(Err(e)) = task.await {
                        tracing::debug!("Cancelled clone finished with: {}", e);
                    }
                    remove_scratch(&scratch).await;
                    drop(permit);
                });
                return Err(AppError::CloneTimeout(timeout_secs));
            }
        };

        let prepared = joined
            .map_err(|e| AppError::Internal(format!("Clone task failed: {}", e)))
            .and_then(|result| result);
        match prepared {
            Ok(query) => Ok((query, permit)),
            Err(e) => {
                remove_scratch(&scratch).await;
                Err(e)
            }
        }
    }
}

/// Per-query scratch directory holding the clone.
fn scratch_dir(query: &IngestionQuery) -> Result<PathBuf> {
    query
        .local_path
        .parent()
        .map(PathBuf::from)
        .ok_or_else(|| AppError::Internal("Invalid scratch path".to_string()))
}

async fn remove_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Cut inline content to `max` characters, noting that the download has everything.
pub fn crop_content(content: &str, max: usize) -> String {
    if content.chars().count() <= max {
        return content.to_string();
    }
    let cropped: String = content.chars().take(max).collect();
    format!(
        "(Files content cropped to {}k characters, download full ingest to see more)\n{}",
        max / 1_000,
        cropped
    )
}
