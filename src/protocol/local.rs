use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use walkdir::WalkDir;

/// Write granularity for streamed downloads.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A local file queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileRecord {
    pub absolute_path: PathBuf,
    /// Path below the upload root, `/`-separated
    pub relative_path: String,
}

/// Every file below `root`, in a stable (file-name sorted) order.
///
/// Symlinks to files are included and read through. An unreadable entry
/// below the root is logged and skipped; only a failure on the root itself
/// is an error.
pub fn list_local_files(root: &Path) -> anyhow::Result<Vec<LocalFileRecord>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping unreadable path during upload walk: {}", e);
                continue;
            }
        };
        if !entry.path().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        files.push(LocalFileRecord {
            absolute_path: entry.path().to_path_buf(),
            relative_path: to_slash(relative),
        });
    }
    Ok(files)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map an absolute remote path below `save_dir`.
///
/// Returns `None` for paths that would escape `save_dir` or name no file.
pub fn local_path_for(save_dir: &Path, remote_path: &str) -> Option<PathBuf> {
    let mut local = save_dir.to_path_buf();
    let mut pushed = false;
    for part in remote_path.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            _ => {}
        }
        // Reject anything a platform would read as more than one plain name.
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return None,
        }
        local.push(part);
        pushed = true;
    }
    pushed.then_some(local)
}

/// Size of an existing regular file, `None` if absent.
pub async fn local_size(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

/// Drain a byte stream into `dest`, truncating any previous content.
pub async fn write_stream<S, E>(stream: S, dest: &Path) -> std::io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut stream = std::pin::pin!(stream);
    let file = tokio::fs::File::create(dest).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(std::io::Error::other)?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(written)
}
