//! Operation handlers
//!
//! One function per operation, each a thin adapter from an [`ArgumentBag`] to
//! a `git_backend` call. Backend errors cross into the response taxonomy
//! through `?` and the executor's single translation table.

use std::path::Path;

use git_backend::RepositoryHandle;

use crate::binder::{ArgValue, ArgumentBag};
use crate::registry::{
    BackendOutput, Handler, HandlerContext, HandlerResult, OperationRegistry, OperationSpec,
    ParameterKind, ParameterSpec,
};

/// Remote used by fetch/pull/push when none is given
pub const DEFAULT_REMOTE: &str = "origin";

/// Commits returned by `log` when `max_count` is absent
pub const DEFAULT_MAX_COUNT: i64 = 10;

fn remote_param() -> ParameterSpec {
    ParameterSpec::optional("remote", ParameterKind::String, "Remote name")
        .with_default(ArgValue::String(DEFAULT_REMOTE.to_string()))
}

fn branch_name_param(description: &'static str) -> ParameterSpec {
    ParameterSpec::required("branch_name", ParameterKind::String, description)
}

/// Build the registry of every supported operation.
pub(crate) fn builtin_registry() -> OperationRegistry {
    let mut registry = OperationRegistry::new();

    registry.register(
        OperationSpec::text("status", "Shows the working tree status"),
        Handler::Repository(status),
    );
    registry.register(
        OperationSpec::text(
            "diff_unstaged",
            "Shows changes in the working directory that are not yet staged",
        ),
        Handler::Repository(diff_unstaged),
    );
    registry.register(
        OperationSpec::text("diff_staged", "Shows changes that are staged for commit"),
        Handler::Repository(diff_staged),
    );
    registry.register(
        OperationSpec::text("diff", "Shows differences between HEAD and a branch or commit")
            .param(ParameterSpec::required(
                "other",
                ParameterKind::String,
                "Branch, tag or commit to compare HEAD with",
            )),
        Handler::Repository(diff),
    );
    registry.register(
        OperationSpec::text("commit", "Records staged changes to the repository").param(
            ParameterSpec::required("message", ParameterKind::String, "Commit message"),
        ),
        Handler::Repository(commit),
    );
    registry.register(
        OperationSpec::text("add", "Adds file contents to the staging area").param(
            ParameterSpec::required(
                "files",
                ParameterKind::StringList,
                "Paths to stage, relative to the repository root or absolute; '.' stages everything",
            ),
        ),
        Handler::Repository(add),
    );
    registry.register(
        OperationSpec::text("reset", "Unstages all staged changes"),
        Handler::Repository(reset),
    );
    registry.register(
        OperationSpec::record_list("log", "Shows the commit history, most recent first").param(
            ParameterSpec::optional(
                "max_count",
                ParameterKind::Integer,
                "Maximum number of commits to show",
            )
                .with_default(ArgValue::Integer(DEFAULT_MAX_COUNT)),
        ),
        Handler::Repository(log),
    );
    registry.register(
        OperationSpec::text("create_branch", "Creates a new branch without switching to it")
            .param(branch_name_param("Name of the new branch"))
            .param(ParameterSpec::optional(
                "start_point",
                ParameterKind::String,
                "Revision to start the branch from (defaults to HEAD)",
            )),
        Handler::Repository(create_branch),
    );
    registry.register(
        OperationSpec::text("switch", "Switches HEAD to a branch")
            .param(branch_name_param("Branch to switch to"))
            .param(
                ParameterSpec::optional(
                    "create_branch",
                    ParameterKind::Boolean,
                    "Create the branch from HEAD before switching",
                )
                .with_default(ArgValue::Boolean(false)),
            ),
        Handler::Repository(switch),
    );
    registry.register(
        OperationSpec::text("init", "Initializes a new Git repository"),
        Handler::Path(init),
    );
    registry.register(
        OperationSpec::text("fetch", "Downloads objects and refs from a remote")
            .param(remote_param())
            .over_network(),
        Handler::Repository(fetch),
    );
    registry.register(
        OperationSpec::text("pull", "Fetches a branch from a remote and integrates it into HEAD")
            .param(remote_param())
            .param(ParameterSpec::optional(
                "branch",
                ParameterKind::String,
                "Remote branch to pull (defaults to the current branch)",
            ))
            .over_network(),
        Handler::Repository(pull),
    );
    registry.register(
        OperationSpec::text("push", "Pushes a local branch to the same name on a remote")
            .param(remote_param())
            .param(ParameterSpec::optional(
                "branch",
                ParameterKind::String,
                "Local branch to push (defaults to the current branch)",
            ))
            .param(
                ParameterSpec::optional(
                    "set_upstream",
                    ParameterKind::Boolean,
                    "Track the remote branch after pushing; it must already exist",
                )
                .with_default(ArgValue::Boolean(false)),
            )
            .over_network(),
        Handler::Repository(push),
    );
    registry.register(
        OperationSpec::text("remote_add", "Registers a new remote")
            .param(ParameterSpec::required("name", ParameterKind::String, "Remote name"))
            .param(ParameterSpec::required("url", ParameterKind::String, "Remote URL or path")),
        Handler::Repository(remote_add),
    );

    registry
}

fn text(body: String) -> HandlerResult {
    Ok(BackendOutput::Text(body))
}

fn status(handle: &RepositoryHandle, _: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::status(handle)?)
}

fn diff_unstaged(handle: &RepositoryHandle, _: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::diff_unstaged(handle)?)
}

fn diff_staged(handle: &RepositoryHandle, _: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::diff_staged(handle)?)
}

fn diff(handle: &RepositoryHandle, args: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::diff_head_to(handle, args.require_string("other")?)?)
}

fn commit(handle: &RepositoryHandle, args: &ArgumentBag, ctx: &HandlerContext) -> HandlerResult {
    let message = args.require_string("message")?;
    text(git_backend::commit(handle, message, ctx.identity.as_ref())?)
}

fn add(handle: &RepositoryHandle, args: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::add(handle, args.require_strings("files")?)?)
}

fn reset(handle: &RepositoryHandle, _: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::reset(handle)?)
}

fn log(handle: &RepositoryHandle, args: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    let max_count = args.require_integer("max_count")?;
    Ok(BackendOutput::Commits(git_backend::list_commits(handle, max_count)?))
}

fn create_branch(
    handle: &RepositoryHandle,
    args: &ArgumentBag,
    _: &HandlerContext,
) -> HandlerResult {
    text(git_backend::create_branch(
        handle,
        args.require_string("branch_name")?,
        args.string("start_point"),
    )?)
}

fn switch(handle: &RepositoryHandle, args: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::switch(
        handle,
        args.require_string("branch_name")?,
        args.require_boolean("create_branch")?,
    )?)
}

fn init(path: &Path, _: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::init(path)?)
}

fn fetch(handle: &RepositoryHandle, args: &ArgumentBag, ctx: &HandlerContext) -> HandlerResult {
    text(git_backend::fetch(
        handle,
        args.require_string("remote")?,
        &ctx.interrupt,
    )?)
}

fn pull(handle: &RepositoryHandle, args: &ArgumentBag, ctx: &HandlerContext) -> HandlerResult {
    text(git_backend::pull(
        handle,
        args.require_string("remote")?,
        args.string("branch"),
        ctx.identity.as_ref(),
        &ctx.interrupt,
    )?)
}

fn push(handle: &RepositoryHandle, args: &ArgumentBag, ctx: &HandlerContext) -> HandlerResult {
    text(git_backend::push(
        handle,
        args.require_string("remote")?,
        args.string("branch"),
        args.require_boolean("set_upstream")?,
        &ctx.interrupt,
    )?)
}

fn remote_add(handle: &RepositoryHandle, args: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
    text(git_backend::remote_add(
        handle,
        args.require_string("name")?,
        args.require_string("url")?,
    )?)
}
