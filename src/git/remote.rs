use git2::{Direction, Remote};

use crate::error::{AppError, Result};
use crate::git::auth::remote_callbacks;
use crate::query::RemoteRefs;

/// ls-remote: branch and tag names advertised by `url`.
///
/// Also serves as the existence check, so any connection failure is reported
/// as an inaccessible repository.
pub fn list_remote_refs(url: &str, token: Option<&str>) -> Result<RemoteRefs> {
    let mut remote = Remote::create_detached(url)?;
    let connection = remote
        .connect_auth(Direction::Fetch, Some(remote_callbacks(url, token)), None)
        .map_err(|e| {
            tracing::debug!("ls-remote failed for {}: {}", url, e);
            AppError::RepoNotFound(url.to_string())
        })?;

    let mut refs = RemoteRefs::default();
    for head in connection.list()? {
        let name = head.name();
        if let Some(branch) = name.strip_prefix("refs/heads/") {
            refs.branches.push(branch.to_string());
        } else if let Some(tag) = name.strip_prefix("refs/tags/") {
            if !tag.ends_with("^{}") {
                refs.tags.push(tag.to_string());
            }
        }
    }

    refs.branches.sort();
    refs.tags.sort();
    Ok(refs)
}
