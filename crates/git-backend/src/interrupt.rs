//! Cooperative interruption for long-running network transfers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared flag polled by libgit2 transfer callbacks.
///
/// Raising it makes the next progress callback return `false`, which aborts
/// the transfer with a user error. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the in-flight operation stop at its next checkpoint.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// A guard that raises this flag when dropped.
    ///
    /// Hold it in the future that waits on a transfer: cancelling the future
    /// then stops the transfer too.
    pub fn raise_on_drop(&self) -> RaiseOnDrop {
        RaiseOnDrop(self.clone())
    }
}

#[derive(Debug)]
#[must_use = "the flag is raised as soon as the guard is dropped"]
pub struct RaiseOnDrop(Interrupt);

impl Drop for RaiseOnDrop {
    fn drop(&mut self) {
        self.0.raise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = Interrupt::new();
        let observer = flag.clone();
        assert!(!observer.is_raised());

        flag.raise();
        assert!(observer.is_raised());
    }

    #[test]
    fn dropping_the_guard_raises() {
        let flag = Interrupt::new();
        let guard = flag.raise_on_drop();
        assert!(!flag.is_raised());

        drop(guard);
        assert!(flag.is_raised());
    }
}
