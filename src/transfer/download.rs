//! Remote to local.
//!
//! Each file is fetched through the direct link `fs/get` hands out when the
//! storage driver can issue one, otherwise proxied through `fs/stream`.

use async_trait::async_trait;
use humansize::{format_size, BINARY};
use reqwest::Response;
use std::path::{Path, PathBuf};

use super::{Transfer, TransferOutcome};
use crate::error::ApiResult;
use crate::protocol::local::{local_path_for, local_size, write_stream};
use crate::protocol::{OpenListClient, RemoteFileEntry};

#[derive(Clone)]
pub struct Downloader {
    client: OpenListClient,
    save_dir: PathBuf,
    skip_existing: bool,
}

impl Downloader {
    pub fn new(client: OpenListClient, save_dir: impl Into<PathBuf>, skip_existing: bool) -> Self {
        Self {
            client,
            save_dir: save_dir.into(),
            skip_existing,
        }
    }

    /// Local destination of a remote file.
    pub fn local_path(&self, entry: &RemoteFileEntry) -> Option<PathBuf> {
        local_path_for(&self.save_dir, &entry.path)
    }

    pub async fn download(&self, entry: &RemoteFileEntry) -> TransferOutcome {
        let Some(local) = self.local_path(entry) else {
            tracing::error!("Refusing to download {}: path leaves the save directory", entry.path);
            return TransferOutcome::Failed(format!("unsafe remote path {}", entry.path));
        };

        match self.try_download(entry, &local).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Download of {} failed: {}", entry.path, e);
                TransferOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_download(&self, entry: &RemoteFileEntry, local: &Path) -> ApiResult<TransferOutcome> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if self.skip_existing && self.already_present(&entry.path, local).await {
            tracing::info!("Skipping existing {}", local.display());
            return Ok(TransferOutcome::Skipped);
        }

        let response = self.open(&entry.path).await?;
        let written = write_stream(response.bytes_stream(), local).await?;
        tracing::info!(
            "Saved {} ({})",
            local.display(),
            format_size(written, BINARY)
        );
        Ok(TransferOutcome::Succeeded(written))
    }

    /// Advisory size comparison; any doubt means "download it".
    async fn already_present(&self, remote_path: &str, local: &Path) -> bool {
        let Some(local_len) = local_size(local).await.filter(|len| *len > 0) else {
            return false;
        };
        match self.client.stat_size(remote_path).await {
            Ok(remote_len) => remote_len == local_len,
            Err(e) => {
                tracing::debug!("Size check for {} unavailable: {}", remote_path, e);
                false
            }
        }
    }

    /// Direct link first, proxied stream when none is issued.
    async fn open(&self, remote_path: &str) -> ApiResult<Response> {
        match self.client.get(remote_path).await {
            Ok(data) => match data.direct_url() {
                Some(url) => {
                    tracing::info!("Downloading {} via direct link", remote_path);
                    self.client.open_direct(url).await
                }
                None => {
                    tracing::debug!("No direct link for {}, streaming", remote_path);
                    self.client.open_stream(remote_path).await
                }
            },
            Err(e) => {
                tracing::debug!("fs/get for {} failed ({}), streaming", remote_path, e);
                self.client.open_stream(remote_path).await
            }
        }
    }
}

#[async_trait]
impl Transfer for Downloader {
    type Item = RemoteFileEntry;

    async fn transfer(&self, item: RemoteFileEntry) -> TransferOutcome {
        self.download(&item).await
    }
}
