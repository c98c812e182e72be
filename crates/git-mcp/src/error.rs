//! Error types for the MCP server
//!
//! Two layers: [`OperationError`] is the closed taxonomy every dispatched
//! operation reports to its caller, [`Error`] covers failures of the server
//! process itself (configuration, I/O, protocol encoding).

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Result type alias for server-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the MCP server
#[derive(Debug, Error)]
pub enum Error {
    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be read
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Config parsed but holds an unusable value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured default repository cannot be used
    #[error("invalid default repository {path}: {source}")]
    InvalidRepository {
        path: PathBuf,
        #[source]
        source: git_backend::Error,
    },
}

/// Kind tag of an [`OperationError`], serialized as its stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RepoNotFound,
    NotARepository,
    UnknownOperation,
    MissingArgument,
    TypeMismatch,
    InvalidArgument,
    InvalidRevision,
    NothingToCommit,
    BranchExists,
    BranchNotFound,
    RemoteExists,
    Conflict,
    RemoteOperation,
    OperationTimedOut,
    BackendInternal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RepoNotFound => "RepoNotFoundError",
            Self::NotARepository => "NotARepositoryError",
            Self::UnknownOperation => "UnknownOperationError",
            Self::MissingArgument => "MissingArgumentError",
            Self::TypeMismatch => "TypeMismatchError",
            Self::InvalidArgument => "InvalidArgumentError",
            Self::InvalidRevision => "InvalidRevisionError",
            Self::NothingToCommit => "NothingToCommitError",
            Self::BranchExists => "BranchExistsError",
            Self::BranchNotFound => "BranchNotFoundError",
            Self::RemoteExists => "RemoteExistsError",
            Self::Conflict => "ConflictError",
            Self::RemoteOperation => "RemoteOperationError",
            Self::OperationTimedOut => "OperationTimedOutError",
            Self::BackendInternal => "BackendInternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A structured failure of one dispatched operation.
///
/// `diagnostic` carries the raw backend message when there is one;
/// `completed_steps` lists what a multi-step operation already did before
/// it failed. Both are omitted from the serialized form when empty.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed_steps: Vec<String>,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            diagnostic: None,
            completed_steps: Vec::new(),
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn with_completed_steps(mut self, steps: Vec<String>) -> Self {
        self.completed_steps = steps;
        self
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownOperation,
            format!("unknown operation '{name}'"),
        )
    }

    pub fn missing_argument(param: &str) -> Self {
        Self::new(
            ErrorKind::MissingArgument,
            format!("missing required argument '{param}'"),
        )
    }

    pub fn type_mismatch(param: &str, expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("argument '{param}' must be {expected}, got {got}"),
        )
    }

    pub fn timed_out(operation: &str, after_secs: u64) -> Self {
        Self::new(
            ErrorKind::OperationTimedOut,
            format!("'{operation}' did not finish within {after_secs}s and was abandoned"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendInternal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_kind_by_stable_name() {
        let err = OperationError::missing_argument("url");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "MissingArgumentError",
                "message": "missing required argument 'url'"
            })
        );
    }

    #[test]
    fn optional_fields_serialize_when_present() {
        let err = OperationError::new(ErrorKind::Conflict, "merge conflict")
            .with_diagnostic("libgit2 said no")
            .with_completed_steps(vec!["fetched 'main' from 'origin'".into()]);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["diagnostic"], "libgit2 said no");
        assert_eq!(value["completed_steps"][0], "fetched 'main' from 'origin'");
    }

    #[test]
    fn display_includes_kind() {
        let err = OperationError::type_mismatch("max_count", "integer", "string");
        assert_eq!(
            err.to_string(),
            "TypeMismatchError: argument 'max_count' must be integer, got string"
        );
    }
}
