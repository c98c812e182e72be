//! Error types for git-backend

use std::path::PathBuf;

/// Result type for git-backend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in git-backend operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {path}")]
    RepoNotFound { path: PathBuf },

    #[error("Not a git repository: {path} ({reason})")]
    NotARepository { path: PathBuf, reason: String },

    #[error("Nothing to commit: the staging area matches HEAD")]
    NothingToCommit,

    #[error("Commit message must not be empty")]
    EmptyCommitMessage,

    #[error("Branch '{name}' already exists")]
    BranchExists { name: String },

    #[error("Branch '{name}' not found")]
    BranchNotFound { name: String },

    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("Revision '{revision}' could not be resolved")]
    InvalidRevision { revision: String },

    #[error("Pathspec '{path}' did not match any files")]
    PathspecNotFound { path: String },

    #[error("Path '{path}' is outside the repository at {root}")]
    PathOutsideRepository { path: String, root: PathBuf },

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("Remote '{name}' already exists")]
    RemoteExists { name: String },

    #[error("Invalid remote name '{name}'")]
    InvalidRemoteName { name: String },

    #[error("Remote operation '{operation}' failed: {message}")]
    RemoteFailed { operation: String, message: String },

    #[error("HEAD is detached; specify a branch explicitly")]
    DetachedHead,

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Operation interrupted before completion")]
    Interrupted,

    /// A multi-step operation failed after some of its steps took effect.
    ///
    /// No rollback is attempted; `completed` lists what already happened.
    #[error("{source} (completed before failure: {})", .completed.join("; "))]
    Partial {
        completed: Vec<String>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn remote(operation: &str, err: git2::Error) -> Self {
        if err.code() == git2::ErrorCode::User {
            return Self::Interrupted;
        }
        Self::RemoteFailed {
            operation: operation.to_string(),
            message: err.message().to_string(),
        }
    }

    /// Wrap `self` as the failing step of a multi-step operation.
    pub fn after(self, completed: Vec<String>) -> Self {
        if completed.is_empty() {
            return self;
        }
        match self {
            Self::Partial {
                completed: mut earlier,
                source,
            } => {
                let mut all = completed;
                all.append(&mut earlier);
                Self::Partial {
                    completed: all,
                    source,
                }
            }
            other => Self::Partial {
                completed,
                source: Box::new(other),
            },
        }
    }
}
