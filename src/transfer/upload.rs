//! Local to remote.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use super::{Transfer, TransferOutcome};
use crate::error::{ApiError, ApiResult};
use crate::protocol::{join_remote, remote_parent, LocalFileRecord, OpenListClient};

/// Remote directories ensured during this run.
///
/// Workers uploading into the same new directory share one `mkdir`: the
/// first caller issues it, the others wait on its result. A failed attempt
/// leaves the slot empty so the next upload retries.
#[derive(Default)]
struct RemoteDirs {
    known: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl RemoteDirs {
    async fn ensure(&self, client: &OpenListClient, dir: &str) -> ApiResult<()> {
        let slot = self
            .known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(dir.to_string())
            .or_default()
            .clone();

        slot.get_or_try_init(|| async {
            client.mkdir(dir).await?;
            tracing::debug!("Remote directory ready: {}", dir);
            Ok::<(), ApiError>(())
        })
        .await
        .map(|_| ())
    }
}

pub struct Uploader {
    client: OpenListClient,
    remote_root: String,
    dirs: RemoteDirs,
}

impl Uploader {
    pub fn new(client: OpenListClient, remote_root: impl Into<String>) -> Self {
        Self {
            client,
            remote_root: remote_root.into(),
            dirs: RemoteDirs::default(),
        }
    }

    pub fn remote_path(&self, record: &LocalFileRecord) -> String {
        join_remote(&self.remote_root, &record.relative_path.replace('\\', "/"))
    }

    pub async fn upload(&self, record: &LocalFileRecord) -> TransferOutcome {
        let remote = self.remote_path(record);
        match self.try_upload(record, &remote).await {
            Ok(sent) => {
                tracing::info!("Uploaded {} -> {}", record.absolute_path.display(), remote);
                TransferOutcome::Succeeded(sent)
            }
            Err(ApiError::Unauthorized) => {
                tracing::error!("Upload of {} rejected: token invalid or expired", remote);
                TransferOutcome::Failed(ApiError::Unauthorized.to_string())
            }
            Err(e) => {
                tracing::error!("Upload of {} failed: {}", remote, e);
                TransferOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_upload(&self, record: &LocalFileRecord, remote: &str) -> ApiResult<u64> {
        tokio::fs::metadata(&record.absolute_path).await?;
        if let Some(parent) = remote_parent(remote) {
            self.dirs.ensure(&self.client, parent).await?;
        }
        self.client.put_file(&record.absolute_path, remote).await
    }
}

#[async_trait]
impl Transfer for Uploader {
    type Item = LocalFileRecord;

    async fn transfer(&self, item: LocalFileRecord) -> TransferOutcome {
        self.upload(&item).await
    }
}
