//! Staging area manipulation and commit creation

use std::path::{Component, Path, PathBuf};

use git2::{Commit, ErrorCode, IndexAddOption, Repository, RepositoryState, Signature};

use crate::{Error, RepositoryHandle, Result};

/// Fallback author/committer identity used when git config defines none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

pub(crate) fn signature(
    repo: &Repository,
    fallback: Option<&Identity>,
) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(e) if e.code() == ErrorCode::NotFound => match fallback {
            Some(id) => Ok(Signature::now(&id.name, &id.email)?),
            None => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}

/// How a single requested path is applied to the index
enum Staging {
    All(String),
    File(PathBuf),
    Removal(PathBuf),
}

fn relative_path(root: &Path, file: &str) -> Result<PathBuf> {
    let outside = || Error::PathOutsideRepository {
        path: file.to_string(),
        root: root.to_path_buf(),
    };

    let path = Path::new(file);
    let relative = if path.is_absolute() {
        let canonical = dunce::canonicalize(path).or_else(|_| {
            // Deleted files cannot be canonicalized; their parent usually can.
            let parent = path.parent().ok_or_else(outside)?;
            let name = path.file_name().ok_or_else(outside)?;
            dunce::canonicalize(parent)
                .map(|p| p.join(name))
                .map_err(|_| outside())
        })?;
        canonical
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .map_err(|_| outside())?
    } else {
        path.to_path_buf()
    };

    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(outside());
    }
    Ok(relative)
}

/// Stage the given paths (files, directories, or `.` for everything).
///
/// All paths are validated before the index is touched, so a bad path leaves
/// the staging area unchanged.
pub fn add(handle: &RepositoryHandle, files: &[String]) -> Result<String> {
    let repo = handle.repo();
    let root = handle.root();
    let mut index = repo.index()?;

    let mut plan = Vec::with_capacity(files.len());
    for file in files {
        let relative = relative_path(root, file)?;
        let spec = relative.to_string_lossy().replace('\\', "/");
        let on_disk = root.join(&relative);

        let step = if spec.is_empty() || spec == "." {
            Staging::All("*".to_string())
        } else if on_disk.is_dir() {
            Staging::All(spec)
        } else if on_disk.symlink_metadata().is_ok() {
            Staging::File(relative)
        } else if index.get_path(&relative, 0).is_some() {
            Staging::Removal(relative)
        } else {
            return Err(Error::PathspecNotFound { path: file.clone() });
        };
        plan.push(step);
    }

    for step in &plan {
        match step {
            Staging::All(spec) => {
                index.add_all([spec.as_str()], IndexAddOption::DEFAULT, None)?;
                index.update_all([spec.as_str()], None)?;
            }
            Staging::File(path) => index.add_path(path)?,
            Staging::Removal(path) => index.remove_path(path)?,
        }
    }
    index.write()?;

    tracing::debug!(count = plan.len(), "Staged paths");
    Ok("Files staged successfully".to_string())
}

/// Unstage everything: reset the index to HEAD without touching the working tree.
///
/// An in-progress merge is abandoned as well, as `git reset` does.
pub fn reset(handle: &RepositoryHandle) -> Result<String> {
    let repo = handle.repo();
    let mut index = repo.index()?;

    match repo.head() {
        Ok(head) => index.read_tree(&head.peel_to_tree()?)?,
        Err(e) if e.code() == ErrorCode::UnbornBranch => index.clear()?,
        Err(e) => return Err(e.into()),
    }
    index.write()?;

    if repo.state() == RepositoryState::Merge {
        repo.cleanup_state()?;
        tracing::info!("Abandoned in-progress merge");
        return Ok("All staged changes reset; merge abandoned".to_string());
    }
    Ok("All staged changes reset".to_string())
}

/// Record the staged changes as a new commit on HEAD.
///
/// Fails with [`Error::NothingToCommit`] when the staged tree equals HEAD's
/// tree (or the index is empty on an unborn branch); no commit is created.
/// While a merge is in progress the commit gets MERGE_HEAD as its second
/// parent and concludes the merge.
pub fn commit(
    handle: &RepositoryHandle,
    message: &str,
    identity: Option<&Identity>,
) -> Result<String> {
    if message.trim().is_empty() {
        return Err(Error::EmptyCommitMessage);
    }

    let repo = handle.repo();
    let mut index = repo.index()?;
    if index.has_conflicts() {
        return Err(Error::Conflict {
            message: "the index contains unresolved conflicts".into(),
        });
    }

    let parent: Option<Commit<'_>> = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if e.code() == ErrorCode::UnbornBranch => None,
        Err(e) => return Err(e.into()),
    };

    let merged = match repo.state() {
        RepositoryState::Merge => Some(repo.find_commit(repo.refname_to_id("MERGE_HEAD")?)?),
        _ => None,
    };

    let tree_id = index.write_tree()?;
    let unchanged = match &parent {
        Some(parent) => merged.is_none() && parent.tree_id() == tree_id,
        None => index.is_empty(),
    };
    if unchanged {
        return Err(Error::NothingToCommit);
    }

    let tree = repo.find_tree(tree_id)?;
    let sig = signature(repo, identity)?;
    let parents: Vec<&Commit<'_>> = parent.iter().chain(merged.iter()).collect();
    let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
    if merged.is_some() {
        repo.cleanup_state()?;
    }

    tracing::info!(commit = %oid, parents = parents.len(), "Created commit");
    Ok(format!("Changes committed successfully with hash {oid}"))
}
