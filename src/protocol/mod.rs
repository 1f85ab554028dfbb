use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub mod http;
pub mod local;

pub use http::OpenListClient;
pub use local::{list_local_files, LocalFileRecord};

/// Application-level success code carried in every JSON body.
pub const CODE_OK: i64 = 200;

/// One remote file discovered during listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    pub name: String,
    /// Absolute remote path, e.g. `/media/a/f1`
    pub path: String,
    pub size: u64,
}

/// Opaque token returned by login, sent verbatim in `Authorization`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Envelope shared by every JSON endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub token: String,
}

/// Body for endpoints addressing a single path (`get`, `stream`, `mkdir`).
#[derive(Debug, Serialize)]
pub struct PathRequest<'a> {
    pub path: &'a str,
    pub password: &'a str,
}

impl<'a> PathRequest<'a> {
    pub fn new(path: &'a str) -> Self {
        Self { path, password: "" }
    }
}

#[derive(Debug, Serialize)]
pub struct ListRequest<'a> {
    pub path: &'a str,
    pub password: &'a str,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListData {
    /// `null` for an empty directory
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Vec<ListItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListItem {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_dir: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct GetData {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub raw_url: Option<String>,
}

impl GetData {
    /// Direct link, if the storage backend issued a usable one.
    pub fn direct_url(&self) -> Option<&str> {
        self.raw_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Body of `put` and `mkdir` replies; only the code matters.
#[derive(Debug, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Join a remote directory and a child name with exactly one `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// Parent directory of a remote path, `None` at the root.
pub fn remote_parent(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    let parent = &path[..idx];
    (!parent.is_empty()).then_some(parent)
}
