//! Side file holding the result of a listing pass.
//!
//! A pretty-printed JSON array of `{name, path, size}` objects, UTF-8 with
//! non-ASCII characters written as-is. Nothing checks that it is still
//! current; a stale entry shows up later as a failed transfer.

use anyhow::{Context, Result};
use std::path::Path;

use crate::protocol::RemoteFileEntry;

pub async fn save(entries: &[RemoteFileEntry], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write manifest {}", path.display()))?;
    tracing::info!("File list saved to {} ({} entries)", path.display(), entries.len());
    Ok(())
}

/// `Ok(None)` when no manifest exists; a corrupt one is an error.
pub async fn load(path: &Path) -> Result<Option<Vec<RemoteFileEntry>>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read manifest {}", path.display()))
        }
    };
    let entries = serde_json::from_str(&raw)
        .with_context(|| format!("Manifest {} is not a valid file list", path.display()))?;
    Ok(Some(entries))
}
