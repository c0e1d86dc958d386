//! Shutdown coordination for background tasks.

use tokio_util::sync::CancellationToken;

/// Coordinator for shutdown.
///
/// Every long-running task holds a child token; triggering cancels them all.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root token. Prefer `child()` for individual tasks.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Token cancelled with the root, cancellable on its own.
    pub fn child(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `trigger` has been called.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }
}
