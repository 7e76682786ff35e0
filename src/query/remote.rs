//! Remote repository locators: URL/slug parsing and ref resolution.

use url::Url;

use crate::error::{AppError, Result};

pub const KNOWN_GIT_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "gitea.com",
    "codeberg.org",
    "gist.github.com",
];

const DEFAULT_HOST: &str = "github.com";

/// Which ref a query targets once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Revision {
    #[default]
    Default,
    Branch(String),
    Tag(String),
    Commit(String),
}

/// Path segments after `/tree/` or `/blob/`, before branch names are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPath {
    pub segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRemote {
    pub url: String,
    pub host: String,
    pub user_name: String,
    pub repo_name: String,
    pub ref_path: Option<RefPath>,
}

impl ParsedRemote {
    pub fn slug(&self) -> String {
        format!("{}-{}", self.user_name, self.repo_name)
    }
}

/// Branch and tag names advertised by a remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRefs {
    pub branches: Vec<String>,
    pub tags: Vec<String>,
}

pub fn is_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn starts_with_known_host(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    KNOWN_GIT_HOSTS
        .iter()
        .any(|host| lower == *host || lower.starts_with(&format!("{}/", host)))
}

/// Parse a repository URL, `host/user/repo` or bare `user/repo` slug.
pub fn parse_remote(input: &str) -> Result<ParsedRemote> {
    let source = input.trim();
    if source.is_empty() {
        return Err(AppError::InvalidRepoUrl(input.to_string()));
    }

    let with_scheme = if source.contains("://") {
        source.to_string()
    } else if starts_with_known_host(source) {
        format!("https://{}", source)
    } else if source.starts_with('/') || source.starts_with('.') || source.starts_with('~') {
        // Filesystem paths are only valid as local sources
        return Err(AppError::InvalidRepoUrl(source.to_string()));
    } else {
        format!("https://{}/{}", DEFAULT_HOST, source)
    };

    let parsed = Url::parse(&with_scheme)?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(AppError::InvalidScheme(parsed.scheme().to_string()));
    }

    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| AppError::InvalidRepoUrl(source.to_string()))?;
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if !KNOWN_GIT_HOSTS.contains(&host.as_str()) {
        return Err(AppError::UnknownHost(host));
    }

    let mut parts = parsed
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
        .into_iter();

    let (user_name, repo_name) = match (parts.next(), parts.next()) {
        (Some(user), Some(repo)) => {
            let repo = repo.strip_suffix(".git").unwrap_or(repo.as_str()).to_string();
            if repo.is_empty() {
                return Err(AppError::InvalidRepoUrl(source.to_string()));
            }
            (user, repo)
        }
        _ => return Err(AppError::InvalidRepoUrl(source.to_string())),
    };

    let mut rest: Vec<String> = parts.collect();
    if rest.first().map(String::as_str) == Some("-") {
        rest.remove(0);
    }

    let ref_path = match rest.first().map(String::as_str) {
        Some("tree") | Some("blob") => {
            let segments: Vec<String> = rest.into_iter().skip(1).collect();
            if segments.is_empty() {
                None
            } else {
                Some(RefPath { segments })
            }
        }
        _ => None,
    };

    Ok(ParsedRemote {
        url: format!("https://{}/{}/{}", host, user_name, repo_name),
        host,
        user_name,
        repo_name,
        ref_path,
    })
}

/// Longest name in `names` that is a segment-wise prefix of `segments`.
fn longest_ref_prefix(segments: &[String], names: &[String]) -> Option<(String, usize)> {
    names
        .iter()
        .filter_map(|name| {
            let name_parts: Vec<&str> = name.split('/').collect();
            let matches = name_parts.len() <= segments.len()
                && name_parts.iter().zip(segments).all(|(a, b)| *a == b.as_str());
            matches.then(|| (name.clone(), name_parts.len()))
        })
        .max_by_key(|(_, len)| *len)
}

fn subpath_from(segments: &[String]) -> String {
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Split a ref path into the revision and the subpath within it.
pub fn resolve_ref_path(ref_path: &RefPath, refs: &RemoteRefs) -> (Revision, String) {
    let segments = &ref_path.segments;
    let Some(first) = segments.first() else {
        return (Revision::Default, "/".to_string());
    };

    if is_commit_hash(first) {
        return (Revision::Commit(first.to_ascii_lowercase()), subpath_from(&segments[1..]));
    }

    if let Some((branch, used)) = longest_ref_prefix(segments, &refs.branches) {
        return (Revision::Branch(branch), subpath_from(&segments[used..]));
    }

    if let Some((tag, used)) = longest_ref_prefix(segments, &refs.tags) {
        return (Revision::Tag(tag), subpath_from(&segments[used..]));
    }

    (Revision::Branch(first.clone()), subpath_from(&segments[1..]))
}
