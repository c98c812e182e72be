//! [`TestRepo`] builder for dispatcher and backend test scenarios.

use std::path::{Path, PathBuf};

use git2::{Oid, Repository};
use tempfile::TempDir;

use crate::git;

/// A temporary git repository with helpers for setup and assertions.
///
/// Remotes created through [`TestRepo::add_bare_remote`] and clones created
/// through [`TestRepo::clone_remote`] live as long as the `TestRepo`.
///
/// # Example
///
/// ```rust,no_run
/// use git_test_utils::TestRepo;
///
/// let repo = TestRepo::with_commit();
/// repo.write("src/lib.rs", "pub fn answer() -> u32 { 42 }\n");
/// repo.commit_all("Add lib");
/// assert_eq!(repo.commit_count(), 2);
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
    repo: Repository,
    scratch: Vec<TempDir>,
}

impl TestRepo {
    /// An initialised repository on `main` with no commits.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let repo = git::real_git_repo(temp_dir.path());
        Self {
            temp_dir,
            repo,
            scratch: Vec::new(),
        }
    }

    /// An initialised repository with `README.md` committed on `main`.
    pub fn with_commit() -> Self {
        let test_repo = Self::new();
        test_repo.write("README.md", "# Test\n");
        test_repo.commit_all("Initial commit");
        test_repo
    }

    /// Root path of the working tree.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root path as an owned string, as a caller would send it.
    pub fn path_str(&self) -> String {
        self.root().to_string_lossy().into_owned()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn write(&self, relative: &str, content: &str) {
        git::write_file(self.root(), relative, content);
    }

    pub fn commit_all(&self, message: &str) -> Oid {
        git::commit_all(&self.repo, message)
    }

    pub fn commit_count(&self) -> usize {
        git::commit_count(&self.repo)
    }

    pub fn head_branch(&self) -> String {
        git::head_branch(&self.repo)
    }

    /// Create a bare repository, register it as `name`, and return its path.
    pub fn add_bare_remote(&mut self, name: &str) -> PathBuf {
        let dir = TempDir::new().unwrap();
        git::bare_remote(dir.path());
        let url = dir.path().to_string_lossy().into_owned();
        self.repo.remote(name, &url).unwrap();
        let path = dir.path().to_path_buf();
        self.scratch.push(dir);
        path
    }

    /// Push `main` to the remote `name` using git2 directly.
    pub fn push_main(&self, name: &str) {
        let mut remote = self.repo.find_remote(name).unwrap();
        remote
            .push(&["refs/heads/main:refs/heads/main"], None)
            .unwrap();
    }

    /// Clone `url` into a fresh temporary directory with a test identity.
    pub fn clone_remote(&mut self, url: &Path) -> Repository {
        let dir = TempDir::new().unwrap();
        let clone = Repository::clone(&url.to_string_lossy(), dir.path()).unwrap();
        git::configure_identity(&clone);
        self.scratch.push(dir);
        clone
    }

    /// Assert that the file at `relative` exists in the working tree.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let full_path = self.root().join(relative);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
