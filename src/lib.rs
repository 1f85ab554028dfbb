//! openlist-sync - batch transfers against an OpenList file server
//!
//! Lists a remote tree into a manifest, then mirrors it to disk with a
//! bounded pool of workers, or pushes a local tree up to the server.
//!
//! # Example
//!
//! ```rust,no_run
//! use openlist_sync::{Config, SyncManager, SyncMode, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.json")?;
//!     let manager = SyncManager::connect(config, SyncOptions::default()).await?;
//!     if let Some(summary) = manager.run(SyncMode::Download).await? {
//!         println!("{}", summary.describe());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod listing;
pub mod logging;
pub mod manifest;
pub mod progress;
pub mod protocol;
pub mod sync;
pub mod transfer;

pub use config::Config;
pub use error::ApiError;
pub use listing::Lister;
pub use progress::{BatchProgress, BatchSummary};
pub use protocol::{Credential, LocalFileRecord, OpenListClient, RemoteFileEntry};
pub use sync::{SyncManager, SyncMode, SyncOptions};
pub use transfer::{Downloader, Transfer, TransferOutcome, Uploader};
