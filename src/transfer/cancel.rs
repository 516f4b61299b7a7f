//! Cooperative cancellation for in-progress transfers.

use tokio_util::sync::CancellationToken;

use crate::error::{Result, TosError};

/// A cancellation handle shared between a transfer's caller and its workers.
///
/// Checked at the suspension points the engine defines: once per scheduler
/// loop iteration before a worker claims a new part, and once per chunk
/// while piping a download's body to disk.
#[derive(Debug, Clone, Default)]
pub struct TransferCancellation(CancellationToken);

impl TransferCancellation {
    /// Create a fresh, unlinked cancellation handle.
    pub fn new() -> Self {
        Self(CancellationToken::new())
    }

    /// Wrap an existing token, e.g. one derived from a caller's own cancellation tree.
    pub fn from_token(token: CancellationToken) -> Self {
        Self(token)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// `Err(TosError::Cancelled)` if cancellation has been requested, else `Ok(())`.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TosError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.0.cancelled().await
    }
}
