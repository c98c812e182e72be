//! Result formatting
//!
//! Text output passes through untouched. Commit lists become ordered records
//! with exactly the keys `hash`, `author`, `date` and `message`.

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use git_backend::CommitInfo;
use serde::Serialize;

use crate::error::OperationError;
use crate::registry::{BackendOutput, ResultShape};

/// One commit (or other entity) as a string-keyed record
pub type Record = BTreeMap<String, String>;

/// The successful result of a dispatched operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationResult {
    Text { body: String },
    RecordList { records: Vec<Record> },
}

impl OperationResult {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }
}

fn commit_record(commit: CommitInfo) -> Record {
    BTreeMap::from([
        ("hash".to_string(), commit.hash),
        ("author".to_string(), commit.author),
        (
            "date".to_string(),
            commit.date.to_rfc3339_opts(SecondsFormat::Secs, false),
        ),
        ("message".to_string(), commit.message),
    ])
}

/// The first `limit` commits as records, in history walk order.
///
/// Author dates are not re-sorted: a back-dated commit still precedes its
/// parents, so a smaller limit always yields a prefix of a larger one. A
/// non-positive limit yields no records.
pub fn commit_records(commits: Vec<CommitInfo>, limit: i64) -> Vec<Record> {
    let limit = usize::try_from(limit).unwrap_or(0);
    commits.into_iter().take(limit).map(commit_record).collect()
}

/// Convert a handler's raw output into the declared result shape.
///
/// `limit` is the call's `max_count`, when the operation has one.
pub fn format(
    shape: ResultShape,
    output: BackendOutput,
    limit: Option<i64>,
) -> Result<OperationResult, OperationError> {
    match (shape, output) {
        (ResultShape::Text, BackendOutput::Text(body)) => Ok(OperationResult::Text { body }),
        (ResultShape::RecordList, BackendOutput::Commits(commits)) => {
            let limit = limit.unwrap_or(i64::MAX);
            Ok(OperationResult::RecordList {
                records: commit_records(commits, limit),
            })
        }
        (ResultShape::Text, BackendOutput::Commits(_)) => Err(OperationError::internal(
            "handler returned records for a text operation",
        )),
        (ResultShape::RecordList, BackendOutput::Text(_)) => Err(OperationError::internal(
            "handler returned text for a record-list operation",
        )),
    }
}
