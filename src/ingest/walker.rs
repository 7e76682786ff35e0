//! Filesystem walk building the `FileSystemNode` tree for a query.
//!
//! Applies ignore/include patterns, the per-file size limit and the global
//! limits (file count, total bytes, depth). Only directories holding at least
//! one kept file end up in the tree.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{AppError, Result};
use crate::models::{FileSystemNode, FileSystemStats, NodeType};
use crate::query::{IngestionQuery, PatternSet};

#[derive(Debug, Clone, Copy)]
pub struct IngestLimits {
    pub max_files: usize,
    pub max_total_size: u64,
    pub max_depth: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_files: 10_000,
            max_total_size: 500 * 1024 * 1024,
            max_depth: 20,
        }
    }
}

struct Filters {
    ignore: PatternSet,
    include: Option<PatternSet>,
    max_file_size: u64,
}

impl Filters {
    fn new(query: &IngestionQuery) -> Result<Self> {
        Ok(Self {
            ignore: PatternSet::new(&query.ignore_patterns)?,
            include: query
                .include_patterns
                .as_ref()
                .map(PatternSet::new)
                .transpose()?,
            max_file_size: query.max_file_size,
        })
    }

    fn is_excluded(&self, rel: &str) -> bool {
        self.ignore.matches(rel)
    }

    fn is_included(&self, rel: &str) -> bool {
        self.include.as_ref().is_none_or(|include| include.matches(rel))
    }

    fn too_large(&self, size: u64) -> bool {
        size > self.max_file_size
    }
}

fn relative_str(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

/// Canonical repository root and walk target.
///
/// Every component of the subpath except the last is resolved, so a symlink
/// inside the repository cannot lead the walk outside of it. A final symlink
/// is kept as is and rendered as a link.
fn resolve_target(query: &IngestionQuery) -> Result<(PathBuf, PathBuf)> {
    let not_found = || AppError::PathNotFound(query.subpath.clone());
    let root = query.local_path.canonicalize().map_err(|_| not_found())?;

    let target = query.target_path();
    let resolved = match (target.parent(), target.file_name()) {
        _ if query.subpath == "/" => root.clone(),
        (Some(parent), Some(name)) => parent.canonicalize().map_err(|_| not_found())?.join(name),
        _ => target.canonicalize().map_err(|_| not_found())?,
    };

    if !resolved.starts_with(&root) {
        tracing::warn!("Rejected subpath {} outside of {}", query.subpath, query.slug);
        return Err(not_found());
    }
    Ok((root, resolved))
}

/// Reason the walk has to stop before accepting a file of `size` bytes.
fn limit_reached(stats: &FileSystemStats, size: u64, limits: &IngestLimits) -> Option<String> {
    if stats.total_files + 1 > limits.max_files {
        return Some(format!("Maximum file limit ({}) reached", limits.max_files));
    }
    if stats.total_size + size > limits.max_total_size {
        return Some(format!(
            "Maximum total size limit ({} bytes) reached",
            limits.max_total_size
        ));
    }
    None
}

/// Attach `leaf` below `root`, creating the directories named by `parents`.
fn insert_leaf(
    root: &mut FileSystemNode,
    repo_root: &Path,
    parents: &[String],
    leaf: FileSystemNode,
) {
    let mut node = root;
    for name in parents {
        let index = match node.children.iter().position(|c| c.is_dir() && c.name == *name) {
            Some(index) => index,
            None => {
                let path = node.path.join(name);
                let rel = relative_str(repo_root, &path);
                let depth = node.depth + 1;
                node.children.push(FileSystemNode::new(
                    name.clone(),
                    NodeType::Directory,
                    path,
                    rel,
                    depth,
                ));
                node.children.len() - 1
            }
        };
        node = &mut node.children[index];
    }
    node.children.push(leaf);
}

/// Fill in aggregate counts bottom-up and order children.
fn finalize(node: &mut FileSystemNode) {
    node.size = 0;
    node.file_count = 0;
    node.dir_count = 0;
    for child in &mut node.children {
        if child.is_dir() {
            finalize(child);
            node.file_count += child.file_count;
            node.dir_count += 1 + child.dir_count;
        } else {
            node.file_count += 1;
        }
        node.size += child.size;
    }
    node.sort_children();
}

fn walk_file(
    query: &IngestionQuery,
    filters: &Filters,
    root_name: String,
    target: PathBuf,
    rel: String,
    metadata: &std::fs::Metadata,
) -> Result<FileSystemNode> {
    let is_symlink = metadata.file_type().is_symlink();
    let filtered = filters.is_excluded(&rel)
        || !filters.is_included(&rel)
        || (!is_symlink && filters.too_large(metadata.len()));
    if filtered {
        return Err(AppError::TargetFiltered(query.subpath.clone()));
    }

    let node_type = if is_symlink {
        NodeType::Symlink
    } else {
        NodeType::File
    };
    let mut node = FileSystemNode::new(root_name, node_type, target, rel, 0);
    if !is_symlink {
        node.size = metadata.len();
    }
    node.file_count = 1;
    Ok(node)
}

/// Walk `query.target_path()` and return the root node.
pub fn walk(query: &IngestionQuery, limits: IngestLimits) -> Result<FileSystemNode> {
    let (repo_root, target) = resolve_target(query)?;
    let metadata = std::fs::symlink_metadata(&target)
        .map_err(|_| AppError::PathNotFound(query.subpath.clone()))?;
    let filters = Filters::new(query)?;

    let root_name = if query.subpath == "/" {
        query.slug.clone()
    } else {
        target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| query.slug.clone())
    };
    let rel = relative_str(&repo_root, &target);

    if !metadata.is_dir() {
        return walk_file(query, &filters, root_name, target, rel, &metadata);
    }

    let mut root = FileSystemNode::new(root_name, NodeType::Directory, target.clone(), rel, 0);
    let mut stats = FileSystemStats::default();
    let mut depth_warned = false;

    let entries = WalkDir::new(&target)
        .follow_links(false)
        .max_depth(limits.max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !filters.is_excluded(&relative_str(&repo_root, e.path()))
        });

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if entry.depth() == limits.max_depth && !depth_warned {
                tracing::warn!(
                    "Not entering {}: maximum depth ({}) reached",
                    entry.path().display(),
                    limits.max_depth
                );
                depth_warned = true;
            }
            continue;
        }

        let node_type = if file_type.is_symlink() {
            NodeType::Symlink
        } else if file_type.is_file() {
            NodeType::File
        } else {
            continue;
        };

        let rel = relative_str(&repo_root, entry.path());
        let size = match node_type {
            NodeType::File => match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", rel, e);
                    continue;
                }
            },
            _ => 0,
        };
        if filters.too_large(size) {
            tracing::debug!("Skipping {}: {} bytes exceeds limit", rel, size);
            continue;
        }
        if !filters.is_included(&rel) {
            continue;
        }
        if let Some(reason) = limit_reached(&stats, size, &limits) {
            tracing::warn!("{}", reason);
            break;
        }
        stats.total_files += 1;
        stats.total_size += size;

        let parents: Vec<String> = entry
            .path()
            .strip_prefix(&target)
            .map(|p| {
                p.parent()
                    .into_iter()
                    .flat_map(|parent| parent.components())
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let name = entry.file_name().to_string_lossy().to_string();
        let mut leaf =
            FileSystemNode::new(name, node_type, entry.path().to_path_buf(), rel, entry.depth());
        leaf.size = size;
        insert_leaf(&mut root, &repo_root, &parents, leaf);
    }

    finalize(&mut root);
    tracing::debug!(
        "Walked {}: {} files, {} bytes",
        query.slug,
        stats.total_files,
        stats.total_size
    );
    Ok(root)
}
