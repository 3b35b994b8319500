//! Cooperative cancellation token.
//!
//! A run is cancelled by setting the flag from the driving side (ctrl-c
//! handler, HTTP cancel endpoint) and polling it from the pipeline side.
//! The fetcher checks the flag once per page, before issuing the request,
//! so an in-flight request is never aborted - only the next one is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag polled by the pipeline.
///
/// Cloning is cheap; all clones observe the same flag. There is one writer
/// (the driver) and one reader (the worker) per run, so relaxed ordering
/// is sufficient.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a new, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current run
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can gate a new run
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_roundtrip() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());

        flag.cancel();
        assert!(flag.is_cancelled());

        flag.reset();
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let observer = flag.clone();

        flag.cancel();
        assert!(observer.is_cancelled());
    }
}
