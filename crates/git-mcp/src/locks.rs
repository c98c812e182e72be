//! Per-path advisory locks
//!
//! One async mutex per canonical repository path, created on first use and
//! never removed, so the table grows only with the number of distinct paths
//! seen. Guards are owned so they can travel into blocking tasks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held for the duration of one operation on a path
pub type PathGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct PathLocks {
    table: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(path.to_path_buf()).or_default())
    }

    /// Wait for exclusive use of `path`.
    pub async fn acquire(&self, path: &Path) -> PathGuard {
        self.entry(path).lock_owned().await
    }

    /// Number of distinct paths ever locked
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
