//! Rendering a walked tree into summary, tree diagram and content blob.

use crate::models::{FileSystemNode, NodeType};
use crate::query::{IngestionQuery, Revision, Source};

const SEPARATOR_WIDTH: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub summary: String,
    pub tree: String,
    pub content: String,
}

impl Digest {
    /// Downloadable text: tree followed by file contents.
    pub fn full_text(&self) -> String {
        format!("{}\n{}", self.tree, self.content)
    }
}

pub fn format_digest(query: &IngestionQuery, root: &FileSystemNode) -> Digest {
    let mut summary = header(query);

    if root.is_dir() {
        summary.push_str(&format!("Files analyzed: {}\n", root.file_count));
    } else {
        let lines = root.content().lines().count();
        summary.push_str(&format!("File: {}\nLines: {}\n", root.name, lines));
    }

    let tree = format!("Directory structure:\n{}", render_tree(root, "", true));
    let content = gather_contents(root);

    let tokens = estimate_tokens(&format!("{}{}", tree, content));
    summary.push_str(&format!("\nEstimated tokens: {}", format_token_count(tokens)));

    Digest {
        summary,
        tree,
        content,
    }
}

fn header(query: &IngestionQuery) -> String {
    let mut out = match &query.source {
        Source::Remote {
            user_name,
            repo_name,
            ..
        } => format!("Repository: {}/{}\n", user_name, repo_name),
        Source::Local { .. } => format!("Directory: {}\n", query.slug),
    };

    match &query.revision {
        Revision::Branch(branch) if branch != "main" && branch != "master" => {
            out.push_str(&format!("Branch: {}\n", branch));
        }
        Revision::Tag(tag) => out.push_str(&format!("Tag: {}\n", tag)),
        Revision::Commit(sha) => out.push_str(&format!("Commit: {}\n", sha)),
        _ => {}
    }

    if query.subpath != "/" {
        out.push_str(&format!("Subpath: {}\n", query.subpath));
    }
    out
}

fn render_tree(node: &FileSystemNode, prefix: &str, is_last: bool) -> String {
    let connector = if is_last { "└── " } else { "├── " };
    let display_name = match node.node_type {
        NodeType::Directory => format!("{}/", node.name),
        NodeType::Symlink => format!("{} -> {}", node.name, node.link_target()),
        NodeType::File => node.name.clone(),
    };

    let mut out = format!("{}{}{}\n", prefix, connector, display_name);
    if node.is_dir() {
        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        let count = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            out.push_str(&render_tree(child, &child_prefix, i + 1 == count));
        }
    }
    out
}

fn file_block(node: &FileSystemNode) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let title = match node.node_type {
        NodeType::Symlink => format!("SYMLINK: {} -> {}", node.path_str, node.link_target()),
        _ => format!("FILE: {}", node.path_str),
    };
    format!("{sep}\n{title}\n{sep}\n{}\n\n", node.content(), sep = separator)
}

fn gather_contents(node: &FileSystemNode) -> String {
    if !node.is_dir() {
        return file_block(node);
    }
    node.children.iter().map(gather_contents).collect()
}

/// Rough token count: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

pub fn format_token_count(tokens: usize) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}k", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}
