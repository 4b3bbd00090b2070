//! Cooperative cancellation shared by the pipeline and the tool runner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle for cancelling a running split.
///
/// Clones share the same flag, so a handle given to a UI thread can stop
/// workers and kill the external process they are waiting on.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a handle in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Workers stop claiming jobs and running tools are terminated.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_flag() {
        let handle = CancelHandle::new();
        let other = handle.clone();

        assert!(!handle.is_cancelled());
        other.cancel();
        assert!(handle.is_cancelled());
    }
}
