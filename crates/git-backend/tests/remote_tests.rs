//! Fetch, pull, push and remote registration against local bare remotes

use git2::{BranchType, Repository};
use git_backend::{
    Error, Interrupt, add, commit, fetch, pull, push, remote_add, reset, resolve, status,
};
use git_test_utils::{TestRepo, git};
use pretty_assertions::assert_eq;

/// A repository with one commit pushed to a bare `origin`.
fn published() -> (TestRepo, std::path::PathBuf) {
    let mut repo = TestRepo::with_commit();
    let remote = repo.add_bare_remote("origin");
    repo.push_main("origin");
    (repo, remote)
}

/// Commit a file in `clone` and push its `main` to `origin`.
fn upstream_commit(clone: &Repository, file: &str, content: &str) -> git2::Oid {
    let workdir = clone.workdir().unwrap().to_path_buf();
    git::write_file(&workdir, file, content);
    let oid = git::commit_all(clone, &format!("Upstream {file}"));
    clone
        .find_remote("origin")
        .unwrap()
        .push(&["refs/heads/main:refs/heads/main"], None)
        .unwrap();
    oid
}

fn remote_tip(remote: &std::path::Path, branch: &str) -> Option<git2::Oid> {
    let bare = Repository::open_bare(remote).unwrap();
    bare.find_reference(&format!("refs/heads/{branch}"))
        .ok()
        .and_then(|r| r.target())
}

#[test]
fn fetch_reports_updated_refs_then_nothing() {
    let (mut repo, remote) = published();
    let clone = repo.clone_remote(&remote);
    upstream_commit(&clone, "upstream.txt", "new\n");
    let handle = resolve(repo.root()).unwrap();

    let first = fetch(&handle, "origin", &Interrupt::new()).unwrap();
    assert!(first.contains("refs/remotes/origin/main"), "{first}");

    let second = fetch(&handle, "origin", &Interrupt::new()).unwrap();
    assert_eq!(second, "No updates from origin");
}

#[test]
fn fetch_unknown_remote_fails() {
    let repo = TestRepo::with_commit();
    let handle = resolve(repo.root()).unwrap();

    let err = fetch(&handle, "upstream", &Interrupt::new()).unwrap_err();
    assert!(matches!(err, Error::RemoteNotFound { ref name } if name == "upstream"));
}

#[test]
fn pull_when_up_to_date() {
    let (repo, _remote) = published();
    let handle = resolve(repo.root()).unwrap();

    let message = pull(&handle, "origin", None, None, &Interrupt::new()).unwrap();
    assert_eq!(message, "Already up to date with origin");
    assert_eq!(repo.commit_count(), 1);
}

#[test]
fn pull_fast_forwards_clean_branch() {
    let (mut repo, remote) = published();
    let clone = repo.clone_remote(&remote);
    let upstream = upstream_commit(&clone, "upstream.txt", "from upstream\n");
    let handle = resolve(repo.root()).unwrap();

    let message = pull(&handle, "origin", None, None, &Interrupt::new()).unwrap();

    assert_eq!(message, format!("Fast-forwarded main to {:.7}", upstream));
    assert_eq!(repo.repo().head().unwrap().target(), Some(upstream));
    repo.assert_file_exists("upstream.txt");
}

#[test]
fn pull_merges_diverged_history() {
    let (mut repo, remote) = published();
    let clone = repo.clone_remote(&remote);
    upstream_commit(&clone, "upstream.txt", "theirs\n");
    repo.write("local.txt", "ours\n");
    repo.commit_all("Local work");
    let handle = resolve(repo.root()).unwrap();

    let message = pull(&handle, "origin", Some("main"), None, &Interrupt::new()).unwrap();

    assert_eq!(message, "Merged origin/main into main");
    let head = repo.repo().head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_count(), 2);
    repo.assert_file_exists("upstream.txt");
    repo.assert_file_exists("local.txt");
}

/// Diverging edits to README.md on both sides, then a pull that conflicts.
fn conflicted_pull() -> (TestRepo, git2::Oid, git2::Oid, Error) {
    let (mut repo, remote) = published();
    let clone = repo.clone_remote(&remote);
    let theirs = upstream_commit(&clone, "README.md", "# Theirs\n");
    repo.write("README.md", "# Ours\n");
    let ours = repo.commit_all("Local edit");
    let handle = resolve(repo.root()).unwrap();

    let err = pull(&handle, "origin", None, None, &Interrupt::new()).unwrap_err();
    (repo, ours, theirs, err)
}

#[test]
fn pull_conflict_reports_completed_fetch_and_leaves_merge_in_progress() {
    let (repo, ours, _theirs, err) = conflicted_pull();

    let Error::Partial { completed, source } = err else {
        panic!("expected partial failure, got {err}");
    };
    assert_eq!(completed, vec!["fetched 'main' from 'origin'".to_string()]);
    assert!(matches!(*source, Error::Conflict { .. }));

    assert_eq!(repo.repo().head().unwrap().target(), Some(ours));
    assert_eq!(repo.repo().state(), git2::RepositoryState::Merge);
    assert!(repo.repo().index().unwrap().has_conflicts());
    let readme = std::fs::read_to_string(repo.root().join("README.md")).unwrap();
    assert!(readme.contains("<<<<<<<"), "{readme}");
    assert!(readme.contains("# Ours") && readme.contains("# Theirs"), "{readme}");

    let handle = resolve(repo.root()).unwrap();
    assert!(status(&handle).unwrap().contains("middle of a merge"));
}

#[test]
fn committing_a_resolved_pull_conflict_records_both_parents() {
    let (repo, ours, theirs, _err) = conflicted_pull();
    let handle = resolve(repo.root()).unwrap();

    let err = commit(&handle, "Too early", None).unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }), "{err}");

    repo.write("README.md", "# Ours and theirs\n");
    add(&handle, &["README.md".to_string()]).unwrap();
    commit(&handle, "Merge upstream", None).unwrap();

    let head = repo.repo().head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_ids().collect::<Vec<_>>(), vec![ours, theirs]);
    assert_eq!(repo.repo().state(), git2::RepositoryState::Clean);
}

#[test]
fn reset_abandons_a_conflicted_pull() {
    let (repo, ours, _theirs, _err) = conflicted_pull();
    let handle = resolve(repo.root()).unwrap();

    assert_eq!(reset(&handle).unwrap(), "All staged changes reset; merge abandoned");

    assert_eq!(repo.repo().state(), git2::RepositoryState::Clean);
    assert!(!repo.repo().index().unwrap().has_conflicts());
    assert_eq!(repo.repo().head().unwrap().target(), Some(ours));
}

#[test]
fn pull_refuses_while_a_merge_is_in_progress() {
    let (repo, _ours, _theirs, _err) = conflicted_pull();
    let handle = resolve(repo.root()).unwrap();

    let err = pull(&handle, "origin", None, None, &Interrupt::new()).unwrap_err();
    assert!(matches!(err, Error::Conflict { .. }), "{err}");
}

#[test]
fn pull_missing_remote_branch_fails() {
    let (repo, _remote) = published();
    let handle = resolve(repo.root()).unwrap();

    let err = pull(&handle, "origin", Some("does-not-exist"), None, &Interrupt::new()).unwrap_err();
    assert!(matches!(err, Error::RemoteFailed { .. }), "{err}");
}

#[test]
fn push_current_branch_updates_remote() {
    let (repo, remote) = published();
    repo.write("more.txt", "more\n");
    let tip = repo.commit_all("More");
    let handle = resolve(repo.root()).unwrap();

    let message = push(&handle, "origin", None, false, &Interrupt::new()).unwrap();

    assert_eq!(message, "Pushed 'main' to 'origin'");
    assert_eq!(remote_tip(&remote, "main"), Some(tip));
}

#[test]
fn push_new_branch_without_upstream() {
    let (repo, remote) = published();
    let handle = resolve(repo.root()).unwrap();
    git_backend::create_branch(&handle, "feature", None).unwrap();

    push(&handle, "origin", Some("feature"), false, &Interrupt::new()).unwrap();

    assert!(remote_tip(&remote, "feature").is_some());
}

#[test]
fn push_set_upstream_writes_tracking_config() {
    let (repo, _remote) = published();
    let handle = resolve(repo.root()).unwrap();

    let message = push(&handle, "origin", Some("main"), true, &Interrupt::new()).unwrap();

    assert!(message.ends_with("Branch 'main' set up to track 'origin/main'"), "{message}");
    let config = repo.repo().config().unwrap().snapshot().unwrap();
    assert_eq!(config.get_str("branch.main.remote").unwrap(), "origin");
    assert_eq!(config.get_str("branch.main.merge").unwrap(), "refs/heads/main");
}

#[test]
fn push_set_upstream_without_remote_branch_fails_before_pushing() {
    let (repo, remote) = published();
    let handle = resolve(repo.root()).unwrap();
    git_backend::create_branch(&handle, "feature", None).unwrap();

    let err = push(&handle, "origin", Some("feature"), true, &Interrupt::new()).unwrap_err();

    assert!(matches!(err, Error::RemoteFailed { .. }), "{err}");
    assert_eq!(remote_tip(&remote, "feature"), None);
    let local = repo.repo().find_branch("feature", BranchType::Local).unwrap();
    assert!(local.upstream().is_err());
}

#[test]
fn push_unknown_local_branch_fails() {
    let (repo, _remote) = published();
    let handle = resolve(repo.root()).unwrap();

    let err = push(&handle, "origin", Some("ghost"), false, &Interrupt::new()).unwrap_err();
    assert!(matches!(err, Error::BranchNotFound { .. }));
}

#[test]
fn remote_add_registers_once() {
    let repo = TestRepo::with_commit();
    let handle = resolve(repo.root()).unwrap();

    let message = remote_add(&handle, "upstream", "https://example.com/repo.git").unwrap();
    assert_eq!(message, "Added remote 'upstream' with URL: https://example.com/repo.git");
    let url = repo.repo().find_remote("upstream").unwrap().url().map(str::to_string);
    assert_eq!(url.as_deref(), Some("https://example.com/repo.git"));

    let err = remote_add(&handle, "upstream", "https://example.com/other.git").unwrap_err();
    assert!(matches!(err, Error::RemoteExists { .. }));
}

#[test]
fn remote_add_rejects_invalid_name() {
    let repo = TestRepo::with_commit();
    let handle = resolve(repo.root()).unwrap();

    let err = remote_add(&handle, "bad name", "https://example.com/repo.git").unwrap_err();
    assert!(matches!(err, Error::InvalidRemoteName { .. }));
}
