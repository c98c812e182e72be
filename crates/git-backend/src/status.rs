//! Working tree status in git's long format

use std::fmt::Write;

use git2::{RepositoryState, Status, StatusEntry, StatusOptions};

use crate::branch::{Head, read_head};
use crate::{RepositoryHandle, Result};

/// Label/path pairs for one status section
type Section = Vec<(&'static str, String)>;

/// Render the working tree status the way `git status` prints it.
pub fn status(handle: &RepositoryHandle) -> Result<String> {
    let repo = handle.repo();
    let mut out = String::new();

    match read_head(repo)? {
        Head::Branch(name) => {
            let _ = writeln!(out, "On branch {name}");
        }
        Head::Unborn(name) => {
            let _ = writeln!(out, "On branch {name}\n\nNo commits yet");
        }
        Head::Detached(oid) => {
            let _ = writeln!(out, "HEAD detached at {:.7}", oid);
        }
    }
    if repo.state() == RepositoryState::Merge {
        let _ = writeln!(out, "\nYou are in the middle of a merge.");
        let _ = writeln!(
            out,
            "  (resolve conflicts, add and commit to conclude it, or reset to abort)"
        );
    }

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);
    let statuses = repo.statuses(Some(&mut opts))?;

    let mut staged: Section = Vec::new();
    let mut unstaged: Section = Vec::new();
    let mut untracked: Vec<String> = Vec::new();

    for entry in statuses.iter() {
        let flags = entry.status();
        let path = entry_path(&entry);

        if flags.is_conflicted() {
            unstaged.push(("both modified", path));
            continue;
        }
        if flags.is_wt_new() {
            untracked.push(path.clone());
        }

        if let Some(label) = index_label(flags) {
            let shown = if flags.is_index_renamed() {
                renamed_path(&entry).unwrap_or_else(|| path.clone())
            } else {
                path.clone()
            };
            staged.push((label, shown));
        }
        if let Some(label) = worktree_label(flags) {
            unstaged.push((label, path));
        }
    }

    write_section(&mut out, "Changes to be committed:", &staged);
    write_section(&mut out, "Changes not staged for commit:", &unstaged);
    if !untracked.is_empty() {
        let _ = writeln!(out, "\nUntracked files:");
        for path in &untracked {
            let _ = writeln!(out, "\t{path}");
        }
    }

    let summary = match (staged.is_empty(), unstaged.is_empty(), untracked.is_empty()) {
        (true, true, true) => Some("nothing to commit, working tree clean"),
        (true, false, _) => Some("no changes added to commit"),
        (true, true, false) => Some("nothing added to commit but untracked files present"),
        _ => None,
    };
    if let Some(summary) = summary {
        let _ = writeln!(out, "\n{summary}");
    }

    Ok(out)
}

fn entry_path(entry: &StatusEntry<'_>) -> String {
    String::from_utf8_lossy(entry.path_bytes()).into_owned()
}

fn renamed_path(entry: &StatusEntry<'_>) -> Option<String> {
    let delta = entry.head_to_index()?;
    let old = delta.old_file().path()?;
    let new = delta.new_file().path()?;
    Some(format!("{} -> {}", old.display(), new.display()))
}

fn index_label(flags: Status) -> Option<&'static str> {
    if flags.is_index_new() {
        Some("new file")
    } else if flags.is_index_modified() {
        Some("modified")
    } else if flags.is_index_deleted() {
        Some("deleted")
    } else if flags.is_index_renamed() {
        Some("renamed")
    } else if flags.is_index_typechange() {
        Some("typechange")
    } else {
        None
    }
}

fn worktree_label(flags: Status) -> Option<&'static str> {
    if flags.is_wt_modified() {
        Some("modified")
    } else if flags.is_wt_deleted() {
        Some("deleted")
    } else if flags.is_wt_renamed() {
        Some("renamed")
    } else if flags.is_wt_typechange() {
        Some("typechange")
    } else {
        None
    }
}

fn write_section(out: &mut String, title: &str, entries: &Section) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}");
    for (label, path) in entries {
        let _ = writeln!(out, "\t{:<12}{path}", format!("{label}:"));
    }
}
