//! Unified diff text for the working tree, the index and arbitrary revisions

use git2::{Diff, DiffFormat, DiffOptions, Repository, Tree};

use crate::branch::resolve_commit;
use crate::{RepositoryHandle, Result};

/// Changes in the working tree that are not yet staged (`git diff`).
pub fn diff_unstaged(handle: &RepositoryHandle) -> Result<String> {
    let repo = handle.repo();
    let diff = repo.diff_index_to_workdir(None, Some(&mut options()))?;
    render(&diff)
}

/// Changes staged for the next commit (`git diff --cached`).
pub fn diff_staged(handle: &RepositoryHandle) -> Result<String> {
    let repo = handle.repo();
    let head = head_tree(repo)?;
    let diff = repo.diff_tree_to_index(head.as_ref(), None, Some(&mut options()))?;
    render(&diff)
}

/// Changes between the current HEAD and `other` (`git diff HEAD <other>`).
pub fn diff_head_to(handle: &RepositoryHandle, other: &str) -> Result<String> {
    let repo = handle.repo();
    let head = head_tree(repo)?;
    let target = resolve_commit(repo, other)?.tree()?;
    let diff = repo.diff_tree_to_tree(head.as_ref(), Some(&target), Some(&mut options()))?;
    render(&diff)
}

fn options() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.context_lines(3);
    opts
}

/// Tree at HEAD, or `None` on an unborn branch (diff against the empty tree).
fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_tree()?)),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn render(diff: &Diff<'_>) -> Result<String> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if let origin @ ('+' | '-' | ' ') = line.origin() {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(text)
}
