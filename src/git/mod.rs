pub mod auth;
pub mod clone;
pub mod remote;

pub use clone::{clone_repo, CloneRequest};
pub use remote::list_remote_refs;

/// Fixture repositories built with git2 for unit tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use git2::{Repository, RepositoryInitOptions, Signature};

    pub fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) {
        let workdir = repo.workdir().expect("non-bare fixture").to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, content) in files {
            let full = workdir.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();

        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    pub fn init_repo(path: &Path, files: &[(&str, &str)]) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(path, &opts).unwrap();
        commit_files(&repo, files, "initial commit");
        repo
    }
}
