//! Cloning a remote into scratch space and checking out the requested revision.
//!
//! Network URLs are cloned with depth 1. A commit or tag that the shallow
//! clone did not bring along is fetched explicitly before checkout.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Oid, Repository};

use crate::error::{AppError, Result};
use crate::git::auth::fetch_options;
use crate::query::Revision;

pub struct CloneRequest<'a> {
    pub url: &'a str,
    pub local_path: &'a Path,
    pub revision: &'a Revision,
    pub token: Option<&'a str>,
    /// Set by the caller to abandon the clone.
    pub cancel: Option<&'a Arc<AtomicBool>>,
}

impl CloneRequest<'_> {
    fn ensure_active(&self) -> Result<()> {
        match self.cancel {
            Some(cancel) if cancel.load(Ordering::Relaxed) => {
                Err(git2::Error::from_str("clone cancelled").into())
            }
            _ => Ok(()),
        }
    }
}

pub fn clone_repo(request: CloneRequest<'_>) -> Result<Repository> {
    request.ensure_active()?;
    if let Some(parent) = request.local_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options(request.url, request.token, true, request.cancel));
    if let Revision::Branch(branch) = request.revision {
        builder.branch(branch);
    }

    tracing::debug!("Cloning {} into {}", request.url, request.local_path.display());
    let repo = builder.clone(request.url, request.local_path)?;
    request.ensure_active()?;

    match request.revision {
        Revision::Commit(sha) => checkout_commit(&repo, &request, sha)?,
        Revision::Tag(tag) => checkout_tag(&repo, &request, tag)?,
        Revision::Default | Revision::Branch(_) => {}
    }

    Ok(repo)
}

fn fetch_refspec(repo: &Repository, request: &CloneRequest<'_>, refspec: &str) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    let mut options = fetch_options(request.url, request.token, true, request.cancel);
    remote.fetch(&[refspec], Some(&mut options), None)?;
    Ok(())
}

fn checkout_detached(repo: &Repository, oid: Oid) -> Result<()> {
    let commit = repo.find_commit(oid)?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repo.set_head_detached(oid)?;
    Ok(())
}

fn checkout_commit(repo: &Repository, request: &CloneRequest<'_>, sha: &str) -> Result<()> {
    let oid = Oid::from_str(sha)?;
    if repo.find_commit(oid).is_err() {
        fetch_refspec(repo, request, sha)?;
    }
    repo.find_commit(oid)
        .map_err(|_| AppError::PathNotFound(format!("commit {}", sha)))?;
    checkout_detached(repo, oid)
}

fn checkout_tag(repo: &Repository, request: &CloneRequest<'_>, tag: &str) -> Result<()> {
    let reference = format!("refs/tags/{}", tag);
    if repo.find_reference(&reference).is_err() {
        fetch_refspec(repo, request, &format!("+{0}:{0}", reference))?;
    }
    let commit = repo
        .revparse_single(&reference)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|_| AppError::PathNotFound(format!("tag {}", tag)))?;
    checkout_detached(repo, commit.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::{commit_files, init_repo};

    fn clone_with(source: &Path, dest: &Path, revision: &Revision) -> Result<Repository> {
        let url = source.to_string_lossy().to_string();
        clone_repo(CloneRequest {
            url: &url,
            local_path: dest,
            revision,
            token: None,
            cancel: None,
        })
    }

    #[test]
    fn test_clone_default_branch() {
        let src = tempfile::tempdir().unwrap();
        init_repo(src.path(), &[("README.md", "hello\n"), ("src/lib.rs", "pub fn a() {}\n")]);

        let scratch = tempfile::tempdir().unwrap();
        let dest = scratch.path().join("id").join("local-repo");
        clone_with(src.path(), &dest, &Revision::Default).unwrap();

        assert_eq!(std::fs::read_to_string(dest.join("README.md")).unwrap(), "hello\n");
        assert!(dest.join("src/lib.rs").exists());
    }

    #[test]
    fn test_clone_branch_tag_and_commit() {
        let src = tempfile::tempdir().unwrap();
        let repo = init_repo(src.path(), &[("VERSION", "1\n")]);
        let first = repo.head().unwrap().peel_to_commit().unwrap();
        repo.tag_lightweight("v1", first.as_object(), false).unwrap();
        repo.branch("stable", &first, false).unwrap();
        commit_files(&repo, &[("VERSION", "2\n")], "bump");

        let scratch = tempfile::tempdir().unwrap();

        let dest = scratch.path().join("head");
        clone_with(src.path(), &dest, &Revision::Default).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("VERSION")).unwrap(), "2\n");

        let dest = scratch.path().join("branch");
        clone_with(src.path(), &dest, &Revision::Branch("stable".into())).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("VERSION")).unwrap(), "1\n");

        let dest = scratch.path().join("tag");
        clone_with(src.path(), &dest, &Revision::Tag("v1".into())).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("VERSION")).unwrap(), "1\n");

        let dest = scratch.path().join("commit");
        clone_with(src.path(), &dest, &Revision::Commit(first.id().to_string())).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("VERSION")).unwrap(), "1\n");
    }

    #[test]
    fn test_clone_unknown_branch_fails() {
        let src = tempfile::tempdir().unwrap();
        init_repo(src.path(), &[("a.txt", "a")]);
        let scratch = tempfile::tempdir().unwrap();

        let result = clone_with(
            src.path(),
            &scratch.path().join("x"),
            &Revision::Branch("does-not-exist".into()),
        );
        assert!(matches!(result, Err(AppError::Git(_))));
    }

    #[test]
    fn test_cancelled_clone_does_not_start() {
        let src = tempfile::tempdir().unwrap();
        init_repo(src.path(), &[("a.txt", "a")]);
        let scratch = tempfile::tempdir().unwrap();
        let dest = scratch.path().join("x");
        let url = src.path().to_string_lossy().to_string();
        let cancel = Arc::new(AtomicBool::new(true));

        let result = clone_repo(CloneRequest {
            url: &url,
            local_path: &dest,
            revision: &Revision::Default,
            token: None,
            cancel: Some(&cancel),
        });
        assert!(matches!(result, Err(AppError::Git(ref e)) if e.message() == "clone cancelled"));
        assert!(!dest.exists());
    }
}
