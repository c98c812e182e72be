//! Operation registry
//!
//! A static table from operation name to its declared parameters, result
//! shape and handler. Built once on first use and read-only afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use git_backend::{CommitInfo, Identity, Interrupt, RepositoryHandle};
use serde_json::{Value, json};

use crate::binder::{ArgValue, ArgumentBag};
use crate::error::OperationError;
use crate::handlers;

/// Type of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    StringList,
    Integer,
    Boolean,
}

impl ParameterKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringList => "string-list",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    /// JSON Schema fragment describing values of this kind.
    pub fn json_schema(self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::StringList => json!({ "type": "array", "items": { "type": "string" } }),
            Self::Integer => json!({ "type": "integer" }),
            Self::Boolean => json!({ "type": "boolean" }),
        }
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub required: bool,
    /// Substituted when the parameter is optional and absent
    pub default: Option<ArgValue>,
    pub description: &'static str,
}

impl ParameterSpec {
    pub fn required(name: &'static str, kind: ParameterKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParameterKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    pub fn with_default(mut self, value: ArgValue) -> Self {
        debug_assert_eq!(value.kind(), self.kind, "default of '{}'", self.name);
        self.default = Some(value);
        self
    }
}

/// Shape of an operation's successful result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Text,
    RecordList,
}

/// Static descriptor of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
    pub result_shape: ResultShape,
    /// Talks to a remote; subject to the network deadline
    pub network: bool,
}

impl OperationSpec {
    pub fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            parameters: Vec::new(),
            result_shape: ResultShape::Text,
            network: false,
        }
    }

    pub fn record_list(name: &'static str, description: &'static str) -> Self {
        Self {
            result_shape: ResultShape::RecordList,
            ..Self::text(name, description)
        }
    }

    pub fn param(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn over_network(mut self) -> Self {
        self.network = true;
        self
    }
}

/// Raw output of a handler, before result formatting
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutput {
    Text(String),
    Commits(Vec<CommitInfo>),
}

/// Per-call state handed to every handler.
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    /// Raised when the caller abandons the call
    pub interrupt: Interrupt,
    /// Fallback signature for commits when git config has none
    pub identity: Option<Identity>,
}

pub type HandlerResult = std::result::Result<BackendOutput, OperationError>;
pub type RepositoryFn = fn(&RepositoryHandle, &ArgumentBag, &HandlerContext) -> HandlerResult;
pub type PathFn = fn(&Path, &ArgumentBag, &HandlerContext) -> HandlerResult;

/// How a handler receives its repository.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Runs against a repository resolved for this call
    Repository(RepositoryFn),
    /// Receives the raw path; the repository need not exist yet
    Path(PathFn),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repository(_) => f.write_str("Handler::Repository"),
            Self::Path(_) => f.write_str("Handler::Path"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisteredOperation {
    pub spec: OperationSpec,
    pub handler: Handler,
}

/// Name-keyed operation table preserving registration order.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    entries: HashMap<&'static str, RegisteredOperation>,
    order: Vec<&'static str>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation.
    ///
    /// # Panics
    /// Panics if an operation with the same name is already registered.
    pub fn register(&mut self, spec: OperationSpec, handler: Handler) {
        let name = spec.name;
        if self.entries.contains_key(name) {
            panic!("operation '{name}' registered twice");
        }
        self.entries.insert(name, RegisteredOperation { spec, handler });
        self.order.push(name);
    }

    pub fn lookup(&self, name: &str) -> std::result::Result<&RegisteredOperation, OperationError> {
        self.entries
            .get(name)
            .ok_or_else(|| OperationError::unknown_operation(name))
    }

    /// Operations in registration order
    pub fn operations(&self) -> impl Iterator<Item = &RegisteredOperation> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

static BUILTIN: LazyLock<OperationRegistry> = LazyLock::new(handlers::builtin_registry);

/// The process-wide registry of every supported git operation.
pub fn registry() -> &'static OperationRegistry {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn noop(_: &Path, _: &ArgumentBag, _: &HandlerContext) -> HandlerResult {
        Ok(BackendOutput::Text(String::new()))
    }

    #[test]
    fn builtin_registry_has_every_operation_in_order() {
        let names: Vec<&str> = registry().operations().map(|op| op.spec.name).collect();
        assert_eq!(
            names,
            vec![
                "status",
                "diff_unstaged",
                "diff_staged",
                "diff",
                "commit",
                "add",
                "reset",
                "log",
                "create_branch",
                "switch",
                "init",
                "fetch",
                "pull",
                "push",
                "remote_add",
            ]
        );
    }

    #[test]
    fn only_log_returns_records() {
        let record_ops: Vec<&str> = registry()
            .operations()
            .filter(|op| op.spec.result_shape == ResultShape::RecordList)
            .map(|op| op.spec.name)
            .collect();
        assert_eq!(record_ops, vec!["log"]);
    }

    #[test]
    fn only_init_takes_a_raw_path() {
        let path_ops: Vec<&str> = registry()
            .operations()
            .filter(|op| matches!(op.handler, Handler::Path(_)))
            .map(|op| op.spec.name)
            .collect();
        assert_eq!(path_ops, vec!["init"]);
    }

    #[test]
    fn documented_defaults() {
        let default_of = |op: &str, param: &str| {
            registry()
                .lookup(op)
                .unwrap()
                .spec
                .parameters
                .iter()
                .find(|p| p.name == param)
                .and_then(|p| p.default.clone())
        };
        assert_eq!(default_of("log", "max_count"), Some(ArgValue::Integer(10)));
        assert_eq!(default_of("fetch", "remote"), Some(ArgValue::String("origin".into())));
        assert_eq!(default_of("pull", "remote"), Some(ArgValue::String("origin".into())));
        assert_eq!(default_of("push", "remote"), Some(ArgValue::String("origin".into())));
        assert_eq!(default_of("push", "set_upstream"), Some(ArgValue::Boolean(false)));
        assert_eq!(default_of("switch", "create_branch"), Some(ArgValue::Boolean(false)));
    }

    #[test]
    fn lookup_unknown_operation() {
        let err = registry().lookup("rebase").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOperation);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_registration_is_fatal() {
        let mut registry = OperationRegistry::new();
        registry.register(OperationSpec::text("noop", "Does nothing"), Handler::Path(noop));
        registry.register(OperationSpec::text("noop", "Does nothing"), Handler::Path(noop));
    }
}
