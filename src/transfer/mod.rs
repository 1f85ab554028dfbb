//! Per-item transfer strategies.

use async_trait::async_trait;
use std::fmt;

pub mod download;
pub mod upload;

pub use download::Downloader;
pub use upload::Uploader;

/// Result of moving one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Already present with the right size
    Skipped,
    /// Bytes moved
    Succeeded(u64),
    Failed(String),
}

impl TransferOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed(_))
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Skipped => f.write_str("skipped"),
            TransferOutcome::Succeeded(bytes) => write!(f, "transferred {} bytes", bytes),
            TransferOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Moves one item between the local disk and the remote.
///
/// Implementations never return errors: every failure becomes
/// [`TransferOutcome::Failed`] so one bad item cannot stop a batch.
#[async_trait]
pub trait Transfer: Send + Sync + 'static {
    type Item: Send + 'static;

    async fn transfer(&self, item: Self::Item) -> TransferOutcome;
}
