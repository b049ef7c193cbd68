//! Teardown flag for the view that owns a gate
//!
//! Once [`Lifecycle::teardown`] is called, in-flight requests are abandoned and
//! their results are never written back to gate state.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::GateError;

/// Shared teardown flag. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    torn_down: Arc<watch::Sender<bool>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Create an active lifecycle.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            torn_down: Arc::new(tx),
        }
    }

    /// Mark the owning view as gone. Idempotent.
    pub fn teardown(&self) {
        self.torn_down.send_replace(true);
    }

    /// Whether the owning view is still mounted.
    pub fn is_active(&self) -> bool {
        !*self.torn_down.borrow()
    }

    /// Resolves once [`teardown`](Self::teardown) has been called.
    pub async fn torn_down(&self) {
        let mut rx = self.torn_down.subscribe();
        // The sender lives as long as `self`, so this only ends on teardown.
        let _ = rx.wait_for(|torn_down| *torn_down).await;
    }

    /// Run `fut` unless the view is torn down first.
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, GateError>
    where
        F: Future<Output = Result<T, GateError>>,
    {
        if !self.is_active() {
            return Err(GateError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.torn_down() => Err(GateError::Cancelled),
            result = fut => result,
        }
    }
}
