//! Include/exclude glob patterns.
//!
//! Patterns match repository-relative `/` paths:
//! - `*` and `?` stay within one component, `**` spans components
//! - a pattern without `/` matches a single component at any depth
//! - a pattern with `/` is anchored at the repository root
//! - a path matches when it, or any ancestor directory, matches

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{AppError, Result};

pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Version control
    ".git",
    ".hg",
    ".svn",
    ".bzr",
    ".gitingest",
    // Python
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".tox",
    ".venv",
    "venv",
    "*.egg-info",
    "*.egg",
    "*.whl",
    "poetry.lock",
    "Pipfile.lock",
    // JavaScript
    "node_modules",
    "bower_components",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    ".npm",
    ".yarn",
    "*.min.js",
    "*.min.css",
    "*.map",
    // Rust / Go / JVM / .NET
    "Cargo.lock",
    "go.sum",
    "*.class",
    "*.jar",
    "*.war",
    ".gradle",
    "bin/Debug",
    "obj/Debug",
    // Build output
    "dist",
    "build",
    "out",
    "*.o",
    "*.a",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.exe",
    "*.lib",
    // Editors and OS
    ".idea",
    ".vscode",
    "*.swp",
    "*.swo",
    ".DS_Store",
    "Thumbs.db",
    // Media and archives
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.svg",
    "*.webp",
    "*.mp3",
    "*.mp4",
    "*.mov",
    "*.pdf",
    "*.zip",
    "*.tar",
    "*.gz",
    "*.tgz",
    "*.7z",
    "*.rar",
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.eot",
    // Misc
    "*.log",
    "*.sqlite",
    "*.db",
    ".env",
    ".cache",
    "coverage",
    ".coverage",
    "htmlcov",
];

fn is_valid_pattern(pattern: &str) -> bool {
    pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./+*@".contains(c))
}

fn normalize_pattern(pattern: &str) -> String {
    let mut pattern = pattern.trim_start_matches('/').to_string();
    if pattern.ends_with('/') {
        pattern.push('*');
    }
    pattern
}

/// Split a user pattern string on commas and whitespace, validate and normalise.
pub fn parse_patterns(raw: &str) -> Result<BTreeSet<String>> {
    let mut patterns = BTreeSet::new();
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if !is_valid_pattern(part) {
            return Err(AppError::InvalidPattern(part.to_string()));
        }
        let normalized = normalize_pattern(part);
        if !normalized.is_empty() {
            patterns.insert(normalized);
        }
    }
    Ok(patterns)
}

/// Ignore set = defaults + exclude - include; include set is `None` when empty.
pub fn build_filters(
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
) -> (BTreeSet<String>, Option<BTreeSet<String>>) {
    let mut ignore: BTreeSet<String> = DEFAULT_IGNORE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect();
    ignore.extend(exclude);
    for pattern in &include {
        ignore.remove(pattern);
    }

    let include = if include.is_empty() { None } else { Some(include) };
    (ignore, include)
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    regex: Regex,
    anchored: bool,
}

/// A compiled set of glob patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

impl PatternSet {
    pub fn new<'a, I>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let trimmed = pattern.trim_end_matches('/');
            if trimmed.is_empty() {
                continue;
            }
            let regex = Regex::new(&glob_to_regex(trimmed))
                .map_err(|_| AppError::InvalidPattern(pattern.clone()))?;
            compiled.push(CompiledPattern {
                regex,
                anchored: trimmed.contains('/'),
            });
        }
        Ok(Self { patterns: compiled })
    }

    /// True when `rel_path` or one of its ancestors matches a pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.trim_matches('/');
        if rel_path.is_empty() {
            return false;
        }

        let components: Vec<&str> = rel_path.split('/').collect();
        for end in 1..=components.len() {
            let prefix = components[..end].join("/");
            let name = components[end - 1];
            for pattern in &self.patterns {
                let candidate = if pattern.anchored { prefix.as_str() } else { name };
                if pattern.regex.is_match(candidate) {
                    return true;
                }
            }
        }
        false
    }
}
