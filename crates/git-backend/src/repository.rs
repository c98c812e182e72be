//! Repository handle resolution and explicit initialization

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use git2::{Repository, RepositoryInitOptions, RepositoryOpenFlags};

use crate::{Error, Result};

/// An opened repository rooted at a validated, canonical working directory.
///
/// Handles are created per call by [`resolve`] and are never cached: dropping
/// the handle releases the underlying libgit2 repository.
pub struct RepositoryHandle {
    root: PathBuf,
    repo: Repository,
}

impl RepositoryHandle {
    /// Canonical path of the working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying libgit2 repository
    pub fn repo(&self) -> &Repository {
        &self.repo
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn open_exact(path: &Path) -> std::result::Result<Repository, git2::Error> {
    Repository::open_ext(
        path,
        RepositoryOpenFlags::NO_SEARCH,
        std::iter::empty::<&OsStr>(),
    )
}

/// Open the repository whose working tree root is exactly `path`.
///
/// Distinguishes a missing path ([`Error::RepoNotFound`]) from an existing
/// path that is not a repository root ([`Error::NotARepository`]). Never
/// initializes anything; see [`init`] for that.
pub fn resolve(path: impl AsRef<Path>) -> Result<RepositoryHandle> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::RepoNotFound {
            path: path.to_path_buf(),
        });
    }

    let root = dunce::canonicalize(path).map_err(|e| Error::io(path, e))?;
    if !root.is_dir() {
        return Err(Error::NotARepository {
            path: root,
            reason: "not a directory".into(),
        });
    }

    let repo = open_exact(&root).map_err(|e| Error::NotARepository {
        path: root.clone(),
        reason: e.message().to_string(),
    })?;

    // Bare repositories and paths inside a .git directory have no usable
    // working tree at `root`.
    let workdir = match repo.workdir() {
        Some(dir) => dunce::canonicalize(dir).map_err(|e| Error::io(dir, e))?,
        None => {
            return Err(Error::NotARepository {
                path: root,
                reason: "bare repository has no working tree".into(),
            });
        }
    };
    if workdir != root {
        return Err(Error::NotARepository {
            path: root,
            reason: format!("working tree root is {}", workdir.display()),
        });
    }

    tracing::debug!(root = %root.display(), "Resolved repository");
    Ok(RepositoryHandle { root, repo })
}

/// Initialize a repository at `path`, creating missing directories.
///
/// Re-initializing an existing repository is safe and leaves its history
/// untouched, matching `git init`.
pub fn init(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let existed = path.exists() && open_exact(path).is_ok();

    let mut opts = RepositoryInitOptions::new();
    opts.mkpath(true);
    Repository::init_opts(path, &opts)?;

    tracing::info!(path = %path.display(), reinitialized = existed, "Initialized repository");

    let verb = if existed {
        "Reinitialized existing"
    } else {
        "Initialized empty"
    };
    Ok(format!("{verb} Git repository in {}", path.display()))
}
