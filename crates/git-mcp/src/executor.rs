//! Operation execution
//!
//! Resolves targets and runs handlers on the blocking pool, enforces the
//! network deadline and owns the single translation table from backend
//! errors to the [`OperationError`] taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use git_backend::{Identity, Interrupt, RepositoryHandle};
use tokio::task::JoinError;
use tokio::time::Instant;

use crate::binder::ArgumentBag;
use crate::error::{ErrorKind, OperationError};
use crate::locks::PathGuard;
use crate::registry::{BackendOutput, Handler, HandlerContext, OperationSpec, RegisteredOperation};

/// What a handler runs against.
#[derive(Debug)]
pub enum Target {
    Repository(RepositoryHandle),
    /// Unresolved path, for operations that create the repository
    Path(PathBuf),
}

/// Settings shared by every execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub identity: Option<Identity>,
    pub network_timeout: Duration,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            identity: None,
            network_timeout: Duration::from_secs(crate::config::DEFAULT_NETWORK_TIMEOUT_SECS),
        }
    }
}

impl ExecutionContext {
    /// When a call to `spec` must be done by, if it is time-limited at all.
    ///
    /// Taken before the path lock is awaited, so waiting behind another call
    /// counts against the same budget.
    pub fn deadline(&self, spec: &OperationSpec) -> Option<Instant> {
        spec.network.then(|| Instant::now() + self.network_timeout)
    }
}

impl From<git_backend::Error> for OperationError {
    fn from(err: git_backend::Error) -> Self {
        use git_backend::Error as E;

        let message = err.to_string();
        match err {
            E::Partial { completed, source } => {
                let inner = OperationError::from(*source);
                OperationError {
                    message,
                    ..inner.with_completed_steps(completed)
                }
            }
            E::RepoNotFound { .. } => OperationError::new(ErrorKind::RepoNotFound, message),
            E::NotARepository { .. } => OperationError::new(ErrorKind::NotARepository, message),
            E::NothingToCommit => OperationError::new(ErrorKind::NothingToCommit, message),
            E::BranchExists { .. } => OperationError::new(ErrorKind::BranchExists, message),
            E::BranchNotFound { .. } => OperationError::new(ErrorKind::BranchNotFound, message),
            E::InvalidRevision { .. } => OperationError::new(ErrorKind::InvalidRevision, message),
            E::RemoteExists { .. } => OperationError::new(ErrorKind::RemoteExists, message),
            E::Conflict { .. } => OperationError::new(ErrorKind::Conflict, message),
            E::EmptyCommitMessage
            | E::InvalidBranchName { .. }
            | E::PathspecNotFound { .. }
            | E::PathOutsideRepository { .. }
            | E::InvalidRemoteName { .. }
            | E::DetachedHead => OperationError::new(ErrorKind::InvalidArgument, message),
            E::RemoteNotFound { .. } => OperationError::new(ErrorKind::RemoteOperation, message),
            E::RemoteFailed { message: raw, .. } => {
                OperationError::new(ErrorKind::RemoteOperation, message).with_diagnostic(raw)
            }
            E::Interrupted => OperationError::new(ErrorKind::OperationTimedOut, message),
            E::Git(raw) => OperationError::internal("unexpected git failure")
                .with_diagnostic(format!("{} ({:?}/{:?})", raw.message(), raw.class(), raw.code())),
            E::Io { .. } => OperationError::internal("filesystem failure").with_diagnostic(message),
        }
    }
}

fn run_handler(
    handler: Handler,
    target: &Target,
    args: &ArgumentBag,
    ctx: &HandlerContext,
) -> Result<BackendOutput, OperationError> {
    match (handler, target) {
        (Handler::Repository(f), Target::Repository(handle)) => f(handle, args, ctx),
        (Handler::Path(f), Target::Path(path)) => f(path, args, ctx),
        (Handler::Path(f), Target::Repository(handle)) => f(handle.root(), args, ctx),
        (Handler::Repository(_), Target::Path(path)) => Err(OperationError::internal(format!(
            "operation needs a resolved repository, got raw path {}",
            path.display()
        ))),
    }
}

fn join_failure(name: &str, err: &JoinError) -> OperationError {
    tracing::error!(operation = name, error = %err, "Blocking task failed");
    let reason = if err.is_panic() { "panicked" } else { "was cancelled" };
    OperationError::internal(format!("operation '{name}' {reason}"))
}

/// Resolve what `handler` runs against, off the async workers.
///
/// Also returns the key for the call's path lock: the repository root, or
/// the canonical form of a path that may not exist yet.
pub async fn prepare(handler: Handler, path: PathBuf) -> Result<(Target, PathBuf), OperationError> {
    let task = tokio::task::spawn_blocking(move || -> Result<(Target, PathBuf), OperationError> {
        match handler {
            Handler::Path(_) => {
                let key = dunce::canonicalize(&path).unwrap_or_else(|_| path.clone());
                Ok((Target::Path(path), key))
            }
            Handler::Repository(_) => {
                let handle = git_backend::resolve(&path)?;
                let key = handle.root().to_path_buf();
                Ok((Target::Repository(handle), key))
            }
        }
    });
    task.await.unwrap_or_else(|e| Err(join_failure("resolve", &e)))
}

/// Run `operation` against `target` on the blocking pool.
///
/// Past `deadline` the call returns `OperationTimedOutError`. Returning early,
/// or dropping this future, raises the handler's interrupt; `guard` is
/// released once the handler really stops, which libgit2's transfer timeouts
/// bound even when no progress callback runs.
pub async fn execute(
    operation: &RegisteredOperation,
    target: Target,
    args: ArgumentBag,
    ctx: &ExecutionContext,
    guard: Option<PathGuard>,
    deadline: Option<Instant>,
) -> Result<BackendOutput, OperationError> {
    let name = operation.spec.name;
    let handler = operation.handler;
    let handler_ctx = HandlerContext {
        interrupt: Interrupt::new(),
        identity: ctx.identity.clone(),
    };
    let _stop = handler_ctx.interrupt.raise_on_drop();

    let mut task = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        run_handler(handler, &target, &args, &handler_ctx)
    });

    let joined = match deadline {
        Some(at) => match tokio::time::timeout_at(at, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(operation = name, timeout = ?ctx.network_timeout, "Operation timed out; interrupting");
                return Err(OperationError::timed_out(name, ctx.network_timeout.as_secs()));
            }
        },
        None => task.await,
    };

    joined.unwrap_or_else(|e| Err(join_failure(name, &e)))
}
