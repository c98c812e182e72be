//! Shared test utilities for the git MCP workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: low-level fixtures operating on a path
//! - [`repo`]: [`TestRepo`](repo::TestRepo) builder owning a temporary repository

pub mod git;
pub mod repo;

pub use repo::TestRepo;
