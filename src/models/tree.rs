//! Filesystem tree produced by the ingestion walk.
//!
//! - `FileSystemNode`: directory, file or symlink with aggregate counts
//! - `NodeType`: node kind
//! - `FileSystemStats`: running totals used to enforce ingest limits

use std::io::Read;
use std::path::PathBuf;

/// Bytes inspected for NUL when deciding whether a file is text.
const BINARY_SNIFF_LEN: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Directory,
    File,
    Symlink,
}

#[derive(Debug, Clone)]
pub struct FileSystemNode {
    pub name: String,
    pub node_type: NodeType,
    pub path: PathBuf,
    /// Path relative to the repository root, `/`-separated.
    pub path_str: String,
    pub size: u64,
    pub file_count: usize,
    pub dir_count: usize,
    pub depth: usize,
    pub children: Vec<FileSystemNode>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemStats {
    pub total_files: usize,
    pub total_size: u64,
}

impl FileSystemNode {
    pub fn new(
        name: String,
        node_type: NodeType,
        path: PathBuf,
        path_str: String,
        depth: usize,
    ) -> Self {
        Self {
            name,
            node_type,
            path,
            path_str,
            size: 0,
            file_count: 0,
            dir_count: 0,
            depth,
            children: Vec::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    /// Symlink target as stored on disk.
    pub fn link_target(&self) -> String {
        std::fs::read_link(&self.path)
            .map(|t| t.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }

    /// Text content for the digest.
    pub fn content(&self) -> String {
        match self.node_type {
            NodeType::Directory => String::new(),
            NodeType::Symlink => self.link_target(),
            NodeType::File => match read_text(&self.path) {
                Ok(Some(text)) => text,
                Ok(None) => "[Non-text file]".to_string(),
                Err(e) => format!("Error reading file: {}", e),
            },
        }
    }

    /// Order children: README.md, files, dot-files, directories, dot-directories.
    pub fn sort_children(&mut self) {
        fn rank(node: &FileSystemNode) -> u8 {
            let hidden = node.name.starts_with('.');
            match (node.is_dir(), hidden) {
                (false, _) if node.name.eq_ignore_ascii_case("readme.md") => 0,
                (false, false) => 1,
                (false, true) => 2,
                (true, false) => 3,
                (true, true) => 4,
            }
        }

        self.children
            .sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name)));
    }
}

/// `Ok(None)` means the file looks binary.
fn read_text(path: &std::path::Path) -> std::io::Result<Option<String>> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;

    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Ok(None);
    }

    Ok(Some(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }))
}
