//! Run orchestration: listing, manifest handling and the transfer pool.

use anyhow::{bail, Context, Result};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::listing::Lister;
use crate::manifest;
use crate::progress::{BatchProgress, BatchSummary};
use crate::protocol::{list_local_files, Credential, OpenListClient, RemoteFileEntry};
use crate::transfer::{Downloader, Transfer, TransferOutcome, Uploader};

pub const DEFAULT_WORKERS: usize = 10;
pub const DOWNLOAD_REPORT_EVERY: usize = 20;
pub const UPLOAD_REPORT_EVERY: usize = 10;

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// List the remote tree and write the manifest, nothing else
    ListOnly,
    /// List, write the manifest, then download every entry
    #[default]
    Download,
    /// Download every entry of an existing manifest without listing
    DownloadFromManifest,
    /// Push the configured local directory to the remote
    UploadOnly,
}

/// Options for a run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Concurrent transfers
    pub workers: usize,
    /// Draw a progress bar instead of periodic progress lines
    pub show_progress: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            show_progress: false,
        }
    }
}

/// Drives one run against an authenticated client.
pub struct SyncManager {
    config: Config,
    client: OpenListClient,
    options: SyncOptions,
}

impl SyncManager {
    /// Wrap a client that already carries its credential.
    pub fn new(config: Config, client: OpenListClient, options: SyncOptions) -> Self {
        Self {
            config,
            client,
            options,
        }
    }

    /// Build the HTTP client and log in.
    pub async fn connect(config: Config, options: SyncOptions) -> Result<Self> {
        let client = OpenListClient::new(&config.openlist_url, config.timeout())?;
        let credential = authenticate(&config, &client).await?;
        Ok(Self::new(config, client.with_credential(credential), options))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute `mode`. Returns the transfer summary, `None` for list-only.
    pub async fn run(&self, mode: SyncMode) -> Result<Option<BatchSummary>> {
        match mode {
            SyncMode::ListOnly => {
                self.list_and_save().await?;
                tracing::info!("List-only mode, exiting");
                Ok(None)
            }
            SyncMode::Download => {
                let entries = self.list_and_save().await?;
                self.download_all(entries).await.map(Some)
            }
            SyncMode::DownloadFromManifest => {
                let path = &self.config.manifest_path;
                tracing::info!("Using existing file list {}", path.display());
                let entries = manifest::load(path)
                    .await?
                    .filter(|entries| !entries.is_empty())
                    .with_context(|| {
                        format!(
                            "No file list found at {}; run once without --download-only first",
                            path.display()
                        )
                    })?;
                self.download_all(entries).await.map(Some)
            }
            SyncMode::UploadOnly => self.upload_all().await.map(Some),
        }
    }

    /// Walk the configured remote path and persist the result.
    pub async fn list_and_save(&self) -> Result<Vec<RemoteFileEntry>> {
        tracing::info!("Listing {}", self.config.remote_path);
        let lister = Lister::new(self.client.clone(), self.config.page_size);
        let entries = lister.list(&self.config.remote_path).await;
        tracing::info!("Found {} files under {}", entries.len(), self.config.remote_path);
        manifest::save(&entries, &self.config.manifest_path).await?;
        Ok(entries)
    }

    pub async fn download_all(&self, entries: Vec<RemoteFileEntry>) -> Result<BatchSummary> {
        if entries.is_empty() {
            bail!("No files found to download");
        }
        tracing::info!("Total files: {}", entries.len());
        tracing::info!("Using {} download workers", self.options.workers);

        let downloader = Arc::new(Downloader::new(
            self.client.clone(),
            &self.config.local_save_dir,
            self.config.skip_existing,
        ));
        let progress = BatchProgress::new(
            "download",
            entries.len(),
            DOWNLOAD_REPORT_EVERY,
            self.options.show_progress,
        );
        let summary = run_pool(downloader, entries, self.options.workers, &progress).await;
        tracing::info!("All downloads finished: {}", summary.describe());
        Ok(summary)
    }

    pub async fn upload_all(&self) -> Result<BatchSummary> {
        let (local_root, remote_root) = self.config.upload_targets()?;
        if !local_root.is_dir() {
            bail!("Local upload directory does not exist: {}", local_root.display());
        }
        tracing::info!("Uploading {} to {}", local_root.display(), remote_root);

        let root = local_root.to_path_buf();
        let files = tokio::task::spawn_blocking(move || list_local_files(&root))
            .await
            .context("Local directory walk panicked")??;
        if files.is_empty() {
            bail!("No files found to upload in {}", local_root.display());
        }
        tracing::info!("Total files: {}", files.len());

        let uploader = Arc::new(Uploader::new(self.client.clone(), remote_root));
        let progress = BatchProgress::new(
            "upload",
            files.len(),
            UPLOAD_REPORT_EVERY,
            self.options.show_progress,
        );
        let summary = run_pool(uploader, files, self.options.workers, &progress).await;
        tracing::info!("All uploads finished: {}", summary.describe());
        Ok(summary)
    }
}

/// Token from the config, or a fresh login with username and password.
pub async fn authenticate(config: &Config, client: &OpenListClient) -> Result<Credential> {
    if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
        tracing::info!("Using configured token");
        return Ok(Credential::new(token));
    }

    let (Some(username), Some(password)) = (config.username.as_deref(), config.password.as_deref())
    else {
        bail!("Config is missing username/password");
    };

    tracing::info!("Logging in to {}", config.openlist_url);
    let credential = client
        .login(username, password)
        .await
        .with_context(|| format!("Login to {} failed", config.openlist_url))?;
    tracing::info!("Login succeeded");
    Ok(credential)
}

/// Run `strategy` over `items` with at most `workers` in flight.
///
/// Outcomes are recorded in completion order. A task that panics counts as
/// a failed item.
pub async fn run_pool<T: Transfer>(
    strategy: Arc<T>,
    items: Vec<T::Item>,
    workers: usize,
    progress: &BatchProgress,
) -> BatchSummary {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = FuturesUnordered::new();

    for item in items {
        let strategy = strategy.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return TransferOutcome::Failed("worker pool closed".to_string());
            };
            strategy.transfer(item).await
        }));
    }

    while let Some(joined) = handles.next().await {
        let outcome = joined
            .unwrap_or_else(|e| TransferOutcome::Failed(format!("worker task panicked: {}", e)));
        progress.record(&outcome);
    }

    progress.finish()
}
