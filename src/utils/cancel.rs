//! Cancellation utilities
//!
//! Provides first-class cancellation handles for streams and long-running
//! operations.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a fresh, uncancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Streams observing this handle end with a
    /// terminal failure at the next chunk boundary; dropping the cancelled
    /// stream closes the underlying HTTP connection so the vendor stops
    /// generating tokens.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
