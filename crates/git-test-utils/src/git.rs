//! Git repository fixtures built with `git2` only.
//!
//! Every fixture writes a local identity and pins the initial branch to
//! `main`, so tests do not depend on the machine's global git config.

use std::fs;
use std::path::Path;

use git2::{IndexAddOption, Oid, Repository, Signature};

/// Name of the branch every fixture starts on.
pub const DEFAULT_BRANCH: &str = "main";

/// Write `user.name`, `user.email` and disable signing in the repository config.
///
/// # Panics
/// Panics if the repository config cannot be written.
pub fn configure_identity(repo: &Repository) {
    let mut config = repo
        .config()
        .unwrap_or_else(|e| panic!("configure_identity: failed to open config: {e}"));
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();
    config.set_bool("commit.gpgsign", false).unwrap();
}

/// Initialises a real git repository (no commits) on branch `main`.
///
/// Realism level: **REAL**: valid git object store, empty history.
///
/// # Panics
/// Panics if `git2::Repository::init` fails.
pub fn real_git_repo(path: &Path) -> Repository {
    let repo = Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    });
    repo.set_head(&format!("refs/heads/{DEFAULT_BRANCH}"))
        .unwrap_or_else(|e| panic!("real_git_repo: failed to point HEAD at main: {e}"));
    configure_identity(&repo);
    repo
}

/// Initialises a bare repository (HEAD on `main`) suitable as a push/fetch remote.
///
/// # Panics
/// Panics if `git2::Repository::init_bare` fails.
pub fn bare_remote(path: &Path) -> Repository {
    let repo = Repository::init_bare(path).unwrap_or_else(|e| {
        panic!(
            "bare_remote: failed to init bare repository at {}: {e}",
            path.display()
        )
    });
    repo.set_head(&format!("refs/heads/{DEFAULT_BRANCH}"))
        .unwrap_or_else(|e| panic!("bare_remote: failed to point HEAD at main: {e}"));
    repo
}

/// Write `content` to `relative` under `root`, creating parent directories.
///
/// # Panics
/// Panics if the filesystem operations fail.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let full = root.join(relative);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("write_file: failed to create {}: {e}", parent.display()));
    }
    fs::write(&full, content)
        .unwrap_or_else(|e| panic!("write_file: failed to write {}: {e}", full.display()));
}

/// Stage every change in the working tree and commit it on HEAD.
///
/// # Panics
/// Panics if any git operation fails.
pub fn commit_all(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], IndexAddOption::DEFAULT, None)
        .unwrap();
    index.update_all(["*"], None).unwrap();
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test User", "test@test.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap_or_else(|e| panic!("commit_all: failed to commit '{message}': {e}"))
}

/// Number of commits reachable from HEAD (zero on an unborn branch).
pub fn commit_count(repo: &Repository) -> usize {
    let Ok(head) = repo.head() else {
        return 0;
    };
    let Some(oid) = head.target() else {
        return 0;
    };
    let mut walk = repo.revwalk().unwrap();
    walk.push(oid).unwrap();
    walk.count()
}

/// Shorthand of the branch HEAD points to, unborn or not.
pub fn head_branch(repo: &Repository) -> String {
    let head = repo.find_reference("HEAD").unwrap();
    head.symbolic_target()
        .unwrap_or("HEAD")
        .trim_start_matches("refs/heads/")
        .to_string()
}
