//! Remote management and network synchronization (fetch, pull, push).
//!
//! Credentials are not handled here: remotes must be reachable anonymously
//! or through the transport's own configuration (local paths, credential-free
//! URLs). Every transfer polls an [`Interrupt`] so the caller can abandon it.

use std::time::Duration;

use git2::build::CheckoutBuilder;
use git2::{
    AnnotatedCommit, BranchType, Direction, ErrorCode, FetchOptions, Oid, PushOptions, Remote,
    RemoteCallbacks, Repository, RepositoryState,
};

use crate::branch::{Head, current_branch_name, read_head, validate_branch_name};
use crate::staging::signature;
use crate::{Error, Identity, Interrupt, RepositoryHandle, Result};

/// Bound how long libgit2 waits to connect to, or hear from, a remote.
///
/// Progress callbacks only run while data flows, so a server that accepts
/// and then goes silent is only noticed through these socket timeouts. They
/// are process-wide; set them once at startup before any transfer begins.
pub fn set_transfer_timeout(timeout: Duration) -> Result<()> {
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    // SAFETY: libgit2 reads these globals when it opens a socket stream. They
    // are written here before the first transfer and never concurrently.
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)?;
    }
    tracing::debug!(timeout_ms = millis, "Configured transfer timeouts");
    Ok(())
}

fn find_remote<'r>(repo: &'r Repository, name: &str) -> Result<Remote<'r>> {
    repo.find_remote(name).map_err(|_| Error::RemoteNotFound {
        name: name.to_string(),
    })
}

/// Callbacks that abort the transfer once `interrupt` is raised.
fn callbacks(interrupt: &Interrupt) -> RemoteCallbacks<'_> {
    let mut cb = RemoteCallbacks::new();
    cb.transfer_progress(move |_| !interrupt.is_raised());
    cb.sideband_progress(move |_| !interrupt.is_raised());
    cb
}

fn transfer_error(operation: &str, err: git2::Error, interrupt: &Interrupt) -> Error {
    if interrupt.is_raised() {
        return Error::Interrupted;
    }
    Error::remote(operation, err)
}

fn describe_tip(refname: &str, old: Oid, new: Oid) -> String {
    if old.is_zero() {
        format!("[new ref] {refname} -> {:.7}", new)
    } else if new.is_zero() {
        format!("[deleted] {refname}")
    } else {
        format!("{:.7}..{:.7} {refname}", old, new)
    }
}

/// Fetch all configured refspecs of `remote_name`.
pub fn fetch(
    handle: &RepositoryHandle,
    remote_name: &str,
    interrupt: &Interrupt,
) -> Result<String> {
    let repo = handle.repo();
    let mut remote = find_remote(repo, remote_name)?;

    let mut updates = Vec::new();
    {
        let mut cb = callbacks(interrupt);
        cb.update_tips(|refname, old, new| {
            updates.push(describe_tip(refname, old, new));
            true
        });
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(cb);

        remote
            .fetch(&[] as &[&str], Some(&mut opts), None)
            .map_err(|e| transfer_error("fetch", e, interrupt))?;
    }

    tracing::info!(remote = %remote_name, updated = updates.len(), "Fetched");
    if updates.is_empty() {
        return Ok(format!("No updates from {remote_name}"));
    }
    Ok(updates.join("\n"))
}

/// Fetch `branch` (default: the current branch) and integrate it into HEAD.
///
/// Fetching and integrating are separate steps; an integration failure
/// reports that the fetch already updated the remote-tracking ref. A merge
/// that conflicts is left in progress, as `git pull` leaves it: conflict
/// markers in the working tree, MERGE_HEAD recorded. [`commit`] concludes it
/// and [`reset`] abandons it.
///
/// [`commit`]: crate::commit
/// [`reset`]: crate::reset
pub fn pull(
    handle: &RepositoryHandle,
    remote_name: &str,
    branch: Option<&str>,
    identity: Option<&Identity>,
    interrupt: &Interrupt,
) -> Result<String> {
    let repo = handle.repo();
    let branch_name = match branch {
        Some(b) => {
            validate_branch_name(b)?;
            b.to_string()
        }
        None => current_branch_name(repo)?,
    };
    if repo.state() != RepositoryState::Clean {
        return Err(Error::Conflict {
            message: "a merge is already in progress; commit or reset it first".into(),
        });
    }
    let mut remote = find_remote(repo, remote_name)?;

    let tracking = format!("refs/remotes/{remote_name}/{branch_name}");
    let refspec = format!("+refs/heads/{branch_name}:{tracking}");
    {
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(callbacks(interrupt));
        remote
            .fetch(&[refspec.as_str()], Some(&mut opts), None)
            .map_err(|e| transfer_error("pull", e, interrupt))?;
    }

    let tracking_ref = repo
        .find_reference(&tracking)
        .map_err(|_| Error::RemoteFailed {
            operation: "pull".into(),
            message: format!("couldn't find remote ref '{branch_name}' on '{remote_name}'"),
        })?;
    let fetched = repo.reference_to_annotated_commit(&tracking_ref)?;
    let completed = vec![format!("fetched '{branch_name}' from '{remote_name}'")];

    integrate(repo, &fetched, &branch_name, remote_name, identity).map_err(|e| {
        tracing::warn!(remote = %remote_name, branch = %branch_name, error = %e, "Fetched but could not integrate");
        e.after(completed)
    })
}

fn integrate(
    repo: &Repository,
    fetched: &AnnotatedCommit<'_>,
    branch_name: &str,
    remote_name: &str,
    identity: Option<&Identity>,
) -> Result<String> {
    let (analysis, _) = repo.merge_analysis(&[fetched])?;
    let target = fetched.id();

    if analysis.is_up_to_date() {
        return Ok(format!("Already up to date with {remote_name}"));
    }

    let mut safe = CheckoutBuilder::new();
    safe.safe();

    if analysis.is_unborn() || analysis.is_fast_forward() {
        let commit = repo.find_commit(target)?;
        repo.checkout_tree(commit.as_object(), Some(&mut safe))
            .map_err(conflict_on_checkout)?;

        let reflog = format!("pull: fast-forward to {target}");
        match read_head(repo)? {
            Head::Branch(current) | Head::Unborn(current) => {
                repo.reference(&format!("refs/heads/{current}"), target, true, &reflog)?;
                repo.set_head(&format!("refs/heads/{current}"))?;
                return Ok(format!("Fast-forwarded {current} to {:.7}", target));
            }
            Head::Detached(_) => {
                repo.set_head_detached(target)?;
                return Ok(format!("Fast-forwarded HEAD to {:.7}", target));
            }
        }
    }

    let current = current_branch_name(repo)?;
    repo.merge(&[fetched], None, Some(&mut safe))
        .map_err(conflict_on_checkout)?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        return Err(Error::Conflict {
            message: format!(
                "merging '{remote_name}/{branch_name}' into '{current}' produced conflicts; \
                 resolve them, add and commit to conclude the merge, or reset to abort it"
            ),
        });
    }

    let sig = signature(repo, identity)?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let head_commit = repo.head()?.peel_to_commit()?;
    let fetched_commit = repo.find_commit(target)?;
    let message = format!("Merge branch '{branch_name}' of {remote_name}");
    repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        &message,
        &tree,
        &[&head_commit, &fetched_commit],
    )?;
    repo.cleanup_state()?;

    Ok(format!("Merged {remote_name}/{branch_name} into {current}"))
}

fn conflict_on_checkout(err: git2::Error) -> Error {
    if err.code() == ErrorCode::Conflict {
        Error::Conflict {
            message: format!("local changes would be overwritten: {}", err.message()),
        }
    } else {
        err.into()
    }
}

/// Push `branch` (default: the current branch) to the same name on `remote_name`.
///
/// With `set_upstream`, the remote branch must already exist; tracking
/// configuration is written only after the push succeeded.
pub fn push(
    handle: &RepositoryHandle,
    remote_name: &str,
    branch: Option<&str>,
    set_upstream: bool,
    interrupt: &Interrupt,
) -> Result<String> {
    let repo = handle.repo();
    let branch_name = match branch {
        Some(b) => {
            validate_branch_name(b)?;
            b.to_string()
        }
        None => current_branch_name(repo)?,
    };
    if repo.find_branch(&branch_name, BranchType::Local).is_err() {
        return Err(Error::BranchNotFound { name: branch_name });
    }

    let mut remote = find_remote(repo, remote_name)?;
    if set_upstream {
        ensure_remote_branch(&mut remote, remote_name, &branch_name, interrupt)?;
    }

    let refspec = format!("refs/heads/{branch_name}:refs/heads/{branch_name}");
    let mut rejected = Vec::new();
    {
        let mut cb = callbacks(interrupt);
        cb.push_update_reference(|refname, status| {
            if let Some(reason) = status {
                rejected.push(format!("{refname}: {reason}"));
            }
            Ok(())
        });
        let mut opts = PushOptions::new();
        opts.remote_callbacks(cb);

        remote
            .push(&[refspec.as_str()], Some(&mut opts))
            .map_err(|e| transfer_error("push", e, interrupt))?;
    }
    if !rejected.is_empty() {
        return Err(Error::RemoteFailed {
            operation: "push".into(),
            message: format!("rejected: {}", rejected.join(", ")),
        });
    }

    tracing::info!(remote = %remote_name, branch = %branch_name, "Pushed");
    let mut message = format!("Pushed '{branch_name}' to '{remote_name}'");

    if set_upstream {
        let completed = vec![format!("pushed '{branch_name}' to '{remote_name}'")];
        set_tracking(repo, &branch_name, remote_name).map_err(|e| e.after(completed))?;
        message.push_str(&format!(
            "\nBranch '{branch_name}' set up to track '{remote_name}/{branch_name}'"
        ));
    }

    Ok(message)
}

fn ensure_remote_branch(
    remote: &mut Remote<'_>,
    remote_name: &str,
    branch_name: &str,
    interrupt: &Interrupt,
) -> Result<()> {
    let wanted = format!("refs/heads/{branch_name}");
    let connection = remote
        .connect_auth(Direction::Fetch, Some(callbacks(interrupt)), None)
        .map_err(|e| transfer_error("push", e, interrupt))?;
    let exists = connection.list()?.iter().any(|head| head.name() == wanted);

    if !exists {
        return Err(Error::RemoteFailed {
            operation: "push".into(),
            message: format!(
                "remote branch '{branch_name}' does not exist on '{remote_name}'; \
                 set_upstream only tracks existing remote branches"
            ),
        });
    }
    Ok(())
}

fn set_tracking(repo: &Repository, branch_name: &str, remote_name: &str) -> Result<()> {
    let mut config = repo.config()?;
    config.set_str(&format!("branch.{branch_name}.remote"), remote_name)?;
    config.set_str(
        &format!("branch.{branch_name}.merge"),
        &format!("refs/heads/{branch_name}"),
    )?;
    Ok(())
}

/// Register a new remote. Performs no network I/O.
pub fn remote_add(handle: &RepositoryHandle, name: &str, url: &str) -> Result<String> {
    if !Remote::is_valid_name(name) {
        return Err(Error::InvalidRemoteName {
            name: name.to_string(),
        });
    }

    handle.repo().remote(name, url).map_err(|e| match e.code() {
        ErrorCode::Exists => Error::RemoteExists {
            name: name.to_string(),
        },
        _ => e.into(),
    })?;

    tracing::info!(remote = %name, url = %url, "Added remote");
    Ok(format!("Added remote '{name}' with URL: {url}"))
}
