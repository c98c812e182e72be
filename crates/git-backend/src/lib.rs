//! Repository operations for the git MCP dispatcher
//!
//! A thin, typed façade over libgit2. Every function takes an already
//! resolved [`RepositoryHandle`] (except [`init`], whose precondition is that
//! the repository need not exist yet) and returns either plain text in the
//! shape `git` itself would print, or structured commit metadata.

pub mod branch;
pub mod commits;
pub mod diff;
pub mod error;
pub mod interrupt;
pub mod remote;
pub mod repository;
pub mod staging;
pub mod status;

pub use branch::{create_branch, switch, validate_branch_name};
pub use commits::{CommitInfo, list_commits};
pub use diff::{diff_head_to, diff_staged, diff_unstaged};
pub use error::{Error, Result};
pub use interrupt::{Interrupt, RaiseOnDrop};
pub use remote::{fetch, pull, push, remote_add, set_transfer_timeout};
pub use repository::{RepositoryHandle, init, resolve};
pub use staging::{Identity, add, commit, reset};
pub use status::status;
