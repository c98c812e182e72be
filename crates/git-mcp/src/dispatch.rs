//! Dispatch façade
//!
//! The single entry point the transport calls: an operation name, a
//! repository path and a raw argument object go in, a [`DispatchResponse`]
//! comes out. Every failure along the way (lookup, binding, resolution,
//! execution, formatting) becomes an [`OperationError`] in the response.
//!
//! ```text
//! lookup -> bind -> resolve -> lock path -> execute -> format
//! ```

use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::binder::{bind, json_type_name};
use crate::config::ServerConfig;
use crate::error::OperationError;
use crate::executor::{self, ExecutionContext};
use crate::formatter::{self, OperationResult};
use crate::locks::PathLocks;
use crate::registry::{OperationRegistry, registry};

/// One call into the dispatch layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchRequest {
    pub operation: String,
    /// Falls back to the configured default repository when absent
    #[serde(default)]
    pub repo_path: Option<String>,
    #[serde(default)]
    pub arguments: Value,
}

impl DispatchRequest {
    pub fn new(
        operation: impl Into<String>,
        repo_path: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self {
            operation: operation.into(),
            repo_path: Some(repo_path.into()),
            arguments,
        }
    }

    /// Build a request from a tool call whose arguments carry `repo_path`
    /// next to the operation's own parameters.
    pub fn from_tool_call(
        operation: impl Into<String>,
        arguments: Value,
    ) -> Result<Self, OperationError> {
        let mut arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(OperationError::type_mismatch(
                    "arguments",
                    "object",
                    json_type_name(&other),
                ));
            }
        };

        let repo_path = match arguments.remove("repo_path") {
            None | Some(Value::Null) => None,
            Some(Value::String(path)) => Some(path),
            Some(other) => {
                return Err(OperationError::type_mismatch(
                    "repo_path",
                    "string",
                    json_type_name(&other),
                ));
            }
        };

        Ok(Self {
            operation: operation.into(),
            repo_path,
            arguments: Value::Object(arguments),
        })
    }
}

/// `{ok: true, result}` or `{ok: false, error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResponse {
    Success(OperationResult),
    Failure(OperationError),
}

impl DispatchResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn result(&self) -> Option<&OperationResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

impl From<Result<OperationResult, OperationError>> for DispatchResponse {
    fn from(outcome: Result<OperationResult, OperationError>) -> Self {
        match outcome {
            Ok(result) => Self::Success(result),
            Err(error) => Self::Failure(error),
        }
    }
}

impl Serialize for DispatchResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Success(result) => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("result", result)?;
            }
            Self::Failure(error) => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

/// Ties registry, binder, resolver, executor and formatter together.
#[derive(Debug)]
pub struct Dispatcher {
    registry: &'static OperationRegistry,
    default_repository: Option<PathBuf>,
    serialize_per_path: bool,
    execution: ExecutionContext,
    locks: PathLocks,
}

impl Dispatcher {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_registry(registry(), config)
    }

    pub fn with_registry(registry: &'static OperationRegistry, config: &ServerConfig) -> Self {
        Self {
            registry,
            default_repository: config.repository.clone(),
            serialize_per_path: config.serialize_per_path,
            execution: ExecutionContext {
                identity: config.fallback_identity(),
                network_timeout: config.network_timeout(),
            },
            locks: PathLocks::new(),
        }
    }

    pub fn registry(&self) -> &'static OperationRegistry {
        self.registry
    }

    pub fn default_repository(&self) -> Option<&Path> {
        self.default_repository.as_deref()
    }

    /// Run one request to completion. Never fails: errors are in the response.
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchResponse {
        tracing::info!(operation = %request.operation, repo = ?request.repo_path, "Dispatching operation");

        let outcome = self.run(&request).await;
        match &outcome {
            Ok(_) => tracing::info!(operation = %request.operation, "Operation succeeded"),
            Err(e) if e.completed_steps.is_empty() => {
                tracing::info!(operation = %request.operation, kind = %e.kind, error = %e.message, "Operation failed");
            }
            Err(e) => {
                tracing::warn!(
                    operation = %request.operation,
                    kind = %e.kind,
                    completed = ?e.completed_steps,
                    "Operation failed part way"
                );
            }
        }
        outcome.into()
    }

    async fn run(&self, request: &DispatchRequest) -> Result<OperationResult, OperationError> {
        let operation = self.registry.lookup(&request.operation)?;

        let empty = Map::new();
        let raw = match &request.arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(OperationError::type_mismatch(
                    "arguments",
                    "object",
                    json_type_name(other),
                ));
            }
        };
        let args = bind(&operation.spec, raw)?;
        let limit = args.integer("max_count");

        let path = self.repo_path(request.repo_path.as_deref())?;
        let deadline = self.execution.deadline(&operation.spec);
        let (target, lock_key) = executor::prepare(operation.handler, path).await?;

        let guard = match (self.serialize_per_path, deadline) {
            (false, _) => None,
            (true, None) => Some(self.locks.acquire(&lock_key).await),
            (true, Some(at)) => {
                let acquired = tokio::time::timeout_at(at, self.locks.acquire(&lock_key)).await;
                let guard = acquired.map_err(|_| {
                    tracing::warn!(
                        operation = operation.spec.name,
                        path = %lock_key.display(),
                        "Timed out waiting for the repository lock"
                    );
                    let secs = self.execution.network_timeout.as_secs();
                    OperationError::timed_out(operation.spec.name, secs)
                })?;
                Some(guard)
            }
        };

        let output =
            executor::execute(operation, target, args, &self.execution, guard, deadline).await?;
        formatter::format(operation.spec.result_shape, output, limit)
    }

    fn repo_path(&self, requested: Option<&str>) -> Result<PathBuf, OperationError> {
        match requested {
            Some(path) => Ok(PathBuf::from(path)),
            None => self
                .default_repository
                .clone()
                .ok_or_else(|| OperationError::missing_argument("repo_path")),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}
