//! JSON configuration file.
//!
//! ```json
//! {
//!   "openlist_url": "https://pan.example.com",
//!   "username": "admin",
//!   "password": "secret",
//!   "remote_path": "/media",
//!   "local_save_dir": "./downloads",
//!   "upload": { "local_path": "./outbox", "remote_upload_path": "/inbox" }
//! }
//! ```

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_MANIFEST_PATH: &str = "filelist.json";
pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the OpenList instance
    pub openlist_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Pre-issued token; when set, login is skipped
    #[serde(default)]
    pub token: Option<String>,
    /// Remote directory to mirror
    pub remote_path: String,
    /// Local directory downloads are written under
    pub local_save_dir: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_true")]
    pub skip_existing: bool,
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadConfig {
    /// Local directory whose files are pushed
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Remote directory they land under
    #[serde(default)]
    pub remote_upload_path: Option<String>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST_PATH)
}

impl Config {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(raw)?;
        config.openlist_url = config.openlist_url.trim().trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.openlist_url)
            .with_context(|| format!("openlist_url is not a valid URL: {}", self.openlist_url))?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "openlist_url must be http or https, got {}",
            url.scheme()
        );
        ensure!(self.page_size > 0, "page_size must be greater than 0");
        ensure!(self.timeout > 0, "timeout must be greater than 0");
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Upload source and destination, both required for upload mode.
    pub fn upload_targets(&self) -> Result<(&Path, &str)> {
        match (&self.upload.local_path, &self.upload.remote_upload_path) {
            (Some(local), Some(remote)) => Ok((local.as_path(), remote.as_str())),
            _ => anyhow::bail!(
                "Upload mode requires upload.local_path and upload.remote_upload_path in the config"
            ),
        }
    }
}
