//! MCP server for structured git operations
//!
//! This crate exposes a fixed set of git operations (status, diffs, staging,
//! commits, history, branches, remotes) to automated callers such as
//! language-model agents, via the Model Context Protocol.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client ]
//!        | (JSON-RPC over stdio)
//!        v
//! [ server ] --> [ dispatch::Dispatcher ]
//!                    | lookup   registry
//!                    | bind     binder
//!                    | resolve  git_backend::resolve
//!                    | lock     locks
//!                    | execute  executor (blocking pool, network deadline)
//!                    | format   formatter
//!                    v
//!               [ git-backend (libgit2) ]
//! ```
//!
//! The dispatch layer is usable without the MCP host:
//!
//! ```no_run
//! use git_mcp::{DispatchRequest, Dispatcher};
//! use serde_json::json;
//!
//! # async fn demo() {
//! let dispatcher = Dispatcher::default();
//! let response = dispatcher
//!     .dispatch(DispatchRequest::new("log", "/path/to/repo", json!({ "max_count": 5 })))
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&response).unwrap());
//! # }
//! ```

pub mod binder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod formatter;
mod handlers;
pub mod locks;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;

pub use binder::{ArgValue, ArgumentBag, bind};
pub use config::ServerConfig;
pub use dispatch::{DispatchRequest, DispatchResponse, Dispatcher};
pub use error::{Error, ErrorKind, OperationError, Result};
pub use formatter::OperationResult;
pub use registry::{
    OperationRegistry, OperationSpec, ParameterKind, ParameterSpec, ResultShape, registry,
};
pub use server::GitMcpServer;
pub use tools::{ToolContent, ToolDefinition, ToolResult, tool_definitions};
