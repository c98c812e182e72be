//! Commit history extraction from HEAD.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{ErrorCode, Sort};

use crate::{RepositoryHandle, Result};

/// Information about a single commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full hex commit hash
    pub hash: String,

    /// Author as `Name <email>`
    pub author: String,

    /// Author timestamp in the author's own offset
    pub date: DateTime<FixedOffset>,

    /// Full commit message, trailing whitespace removed
    pub message: String,
}

/// Walk history from HEAD, newest first, yielding at most `max_count` commits.
///
/// Children always come before their parents, whatever their dates say, so
/// the result for a smaller `max_count` is a prefix of a larger one. A
/// non-positive `max_count` or an unborn branch yields an empty list.
pub fn list_commits(handle: &RepositoryHandle, max_count: i64) -> Result<Vec<CommitInfo>> {
    let Ok(limit) = usize::try_from(max_count) else {
        return Ok(Vec::new());
    };
    if limit == 0 {
        return Ok(Vec::new());
    }

    let repo = handle.repo();
    let head = match repo.head() {
        Ok(head) => head.peel_to_commit()?,
        Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut revwalk = repo.revwalk()?;
    revwalk.push(head.id())?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut commits = Vec::with_capacity(limit.min(64));
    for oid_result in revwalk.take(limit) {
        let oid = oid_result?;
        let commit = repo.find_commit(oid)?;

        let author = commit.author();
        let when = author.when();
        let offset = FixedOffset::east_opt(when.offset_minutes() * 60).unwrap_or(Utc.fix());
        let date = DateTime::from_timestamp(when.seconds(), 0)
            .unwrap_or_default()
            .with_timezone(&offset);

        commits.push(CommitInfo {
            hash: oid.to_string(),
            author: format!(
                "{} <{}>",
                author.name().unwrap_or("Unknown"),
                author.email().unwrap_or("")
            ),
            date,
            message: String::from_utf8_lossy(commit.message_bytes())
                .trim_end()
                .to_string(),
        });
    }

    Ok(commits)
}
