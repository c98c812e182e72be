//! Branch creation, switching and HEAD inspection

use git2::build::CheckoutBuilder;
use git2::{Branch, BranchType, Commit, ErrorCode, Oid, Repository};

use crate::{Error, RepositoryHandle, Result};

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Head {
    /// HEAD is attached to a branch with at least one commit
    Branch(String),
    /// HEAD is attached to a branch that has no commits yet
    Unborn(String),
    Detached(Oid),
}

pub(crate) fn read_head(repo: &Repository) -> Result<Head> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(Head::Branch(
            head.shorthand().unwrap_or("HEAD").to_string(),
        )),
        Ok(head) => Ok(Head::Detached(head.peel_to_commit()?.id())),
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            let target = head.symbolic_target().unwrap_or("refs/heads/master");
            Ok(Head::Unborn(
                target.trim_start_matches("refs/heads/").to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Name of the branch HEAD is attached to, born or not.
pub(crate) fn current_branch_name(repo: &Repository) -> Result<String> {
    match read_head(repo)? {
        Head::Branch(name) | Head::Unborn(name) => Ok(name),
        Head::Detached(_) => Err(Error::DetachedHead),
    }
}

/// Validate a branch name for safety.
///
/// Rejects names that could be interpreted as git flags, contain path traversal
/// sequences, null bytes, or other characters git refuses in ref names.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::InvalidBranchName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.starts_with('-') {
        return invalid("must not start with '-'");
    }
    if name.contains('\0') {
        return invalid("must not contain null bytes");
    }
    if name.contains("..") {
        return invalid("must not contain '..'");
    }
    if name.len() > 255 {
        return invalid("exceeds maximum length of 255 bytes");
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return invalid("must not contain whitespace or control characters");
    }
    // Git ref restrictions
    let forbidden = ['~', '^', ':', '?', '*', '[', '\\'];
    if let Some(ch) = name.chars().find(|c| forbidden.contains(c)) {
        return invalid(&format!("contains invalid character '{ch}'"));
    }
    if name.ends_with('/') || name.ends_with('.') || name.ends_with(".lock") {
        return invalid("must not end with '/', '.', or '.lock'");
    }
    if !Branch::name_is_valid(name)? {
        return invalid("rejected by git ref name rules");
    }
    Ok(())
}

/// Resolve any revision expression (branch, tag, sha, `HEAD~2`) to a commit.
pub(crate) fn resolve_commit<'r>(repo: &'r Repository, revision: &str) -> Result<Commit<'r>> {
    repo.revparse_single(revision)
        .and_then(|object| object.peel_to_commit())
        .map_err(|_| Error::InvalidRevision {
            revision: revision.to_string(),
        })
}

fn branch_exists(repo: &Repository, name: &str) -> bool {
    repo.find_branch(name, BranchType::Local).is_ok()
}

fn create_ref(repo: &Repository, name: &str, commit: &Commit<'_>) -> Result<()> {
    repo.branch(name, commit, false).map_err(|e| {
        if e.code() == ErrorCode::Exists {
            Error::BranchExists {
                name: name.to_string(),
            }
        } else {
            e.into()
        }
    })?;
    Ok(())
}

/// Create a local branch at `start_point` (HEAD when absent) without switching.
pub fn create_branch(
    handle: &RepositoryHandle,
    name: &str,
    start_point: Option<&str>,
) -> Result<String> {
    validate_branch_name(name)?;
    let repo = handle.repo();

    let (commit, base) = match start_point {
        Some(revision) => (resolve_commit(repo, revision)?, revision.to_string()),
        None => match read_head(repo)? {
            Head::Branch(current) => (repo.head()?.peel_to_commit()?, current),
            Head::Detached(oid) => (repo.find_commit(oid)?, format!("{:.7}", oid)),
            Head::Unborn(_) => {
                return Err(Error::InvalidRevision {
                    revision: "HEAD".into(),
                });
            }
        },
    };

    if branch_exists(repo, name) {
        return Err(Error::BranchExists {
            name: name.to_string(),
        });
    }
    create_ref(repo, name, &commit)?;

    tracing::info!(branch = %name, base = %base, "Created branch");
    Ok(format!("Created branch '{name}' from '{base}'"))
}

/// Switch HEAD to `name`, optionally creating it from the current HEAD first.
///
/// Creation and checkout are separate steps. If the checkout fails after the
/// branch was created, the branch is kept and the error reports it.
pub fn switch(handle: &RepositoryHandle, name: &str, create: bool) -> Result<String> {
    validate_branch_name(name)?;
    let repo = handle.repo();
    let exists = branch_exists(repo, name);

    if !create {
        if !exists {
            return Err(Error::BranchNotFound {
                name: name.to_string(),
            });
        }
        checkout_branch(repo, name)?;
        tracing::info!(branch = %name, "Switched branch");
        return Ok(format!("Switched to branch '{name}'"));
    }

    if exists {
        return Err(Error::BranchExists {
            name: name.to_string(),
        });
    }

    if let Head::Unborn(_) = read_head(repo)? {
        // Nothing to branch from: re-point the unborn HEAD, as `git switch -c` does.
        repo.set_head(&format!("refs/heads/{name}"))?;
        return Ok(format!("Created and switched to new branch '{name}'"));
    }

    let commit = repo.head()?.peel_to_commit()?;
    create_ref(repo, name, &commit)?;
    let completed = vec![format!("created branch '{name}'")];

    if let Err(e) = checkout_branch(repo, name) {
        tracing::warn!(branch = %name, error = %e, "Branch created but switch failed");
        return Err(e.after(completed));
    }

    tracing::info!(branch = %name, "Created and switched branch");
    Ok(format!("Created and switched to new branch '{name}'"))
}

fn checkout_branch(repo: &Repository, name: &str) -> Result<()> {
    let refname = format!("refs/heads/{name}");
    let target = repo.revparse_single(&refname)?;

    let mut builder = CheckoutBuilder::new();
    builder.safe();
    repo.checkout_tree(&target, Some(&mut builder))
        .map_err(|e| match e.code() {
            ErrorCode::Conflict => Error::Conflict {
                message: format!(
                    "local changes would be overwritten by switching to '{name}': {}",
                    e.message()
                ),
            },
            _ => e.into(),
        })?;
    repo.set_head(&refname)?;
    Ok(())
}
