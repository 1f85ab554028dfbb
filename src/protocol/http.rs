use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use super::{
    ApiResponse, Credential, GetData, ListData, ListItem, ListRequest, LoginData, LoginRequest,
    PathRequest, StatusReply, CODE_OK,
};
use crate::error::{truncate_body, ApiError, ApiResult};

const USER_AGENT: &str = concat!("openlist-sync/", env!("CARGO_PKG_VERSION"));

/// Bytes of a failed reply kept for diagnostics.
const BODY_PREVIEW: usize = 1000;
const MKDIR_BODY_PREVIEW: usize = 500;

/// `File-Path` header encoding: everything but unreserved characters and `/`.
const FILE_PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// HTTP client for one OpenList instance.
///
/// Cloning is cheap; the credential is fixed once attached and every clone
/// handed to a worker carries the same immutable value.
#[derive(Clone)]
pub struct OpenListClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    credential: Option<Credential>,
}

impl OpenListClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            credential: None,
        })
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Some(credential) => request.header(AUTHORIZATION, credential.as_str()),
            None => request,
        }
    }

    /// POST a JSON body and unwrap the `{code, message, data}` envelope.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorize(self.client.post(self.endpoint(path)))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: preview(&text, BODY_PREVIEW).to_string(),
            });
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text)?;
        if envelope.code != CODE_OK {
            return Err(ApiError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        envelope
            .data
            .ok_or_else(|| ApiError::Malformed(format!("{} reply has no data", path)))
    }

    /// Exchange username and password for a token.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Credential> {
        let data: LoginData = self
            .post_json("/api/auth/login", &LoginRequest { username, password })
            .await?;
        Ok(Credential::new(data.token))
    }

    /// One page of a directory listing.
    pub async fn list_page(&self, path: &str, page: u32, per_page: u32) -> ApiResult<Vec<ListItem>> {
        let request = ListRequest {
            path,
            password: "",
            page,
            per_page,
        };
        let data: ListData = self.post_json("/api/fs/list", &request).await?;
        Ok(data.content)
    }

    /// File metadata, including the direct link when the backend has one.
    pub async fn get(&self, path: &str) -> ApiResult<GetData> {
        self.post_json("/api/fs/get", &PathRequest::new(path)).await
    }

    /// Authoritative remote size of a file.
    pub async fn stat_size(&self, path: &str) -> ApiResult<u64> {
        Ok(self.get(path).await?.size)
    }

    /// Open a proxied byte stream of a file through the API server.
    pub async fn open_stream(&self, path: &str) -> ApiResult<Response> {
        let response = self
            .authorize(self.client.post(self.endpoint("/api/fs/stream")))
            .json(&PathRequest::new(path))
            .send()
            .await?;
        ensure_ok(response).await
    }

    /// Open a direct link. No API credential is attached.
    pub async fn open_direct(&self, url: &str) -> ApiResult<Response> {
        let response = self.client.get(url).send().await?;
        ensure_ok(response).await
    }

    /// Create a remote directory; an existing one counts as created.
    pub async fn mkdir(&self, path: &str) -> ApiResult<()> {
        let response = self
            .authorize(self.client.post(self.endpoint("/api/fs/mkdir")))
            .timeout(self.timeout)
            .json(&PathRequest::new(path))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let reply: StatusReply = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(_) if status == StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized),
            Err(_) => {
                return Err(ApiError::Malformed(format!(
                    "non-JSON mkdir response (status {}): {:?}",
                    status.as_u16(),
                    preview(&text, MKDIR_BODY_PREVIEW)
                )))
            }
        };

        if status == StatusCode::OK && reply.code == CODE_OK {
            Ok(())
        } else if reply.message.contains("already exists") {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED || reply.code == 401 {
            Err(ApiError::Unauthorized)
        } else if status != StatusCode::OK {
            Err(ApiError::Status {
                status: status.as_u16(),
                body: preview(&text, MKDIR_BODY_PREVIEW).to_string(),
            })
        } else {
            Err(ApiError::Api {
                code: reply.code,
                message: reply.message,
            })
        }
    }

    /// Stream a local file to `remote_path`. Returns the bytes sent.
    pub async fn put_file(&self, local_path: &Path, remote_path: &str) -> ApiResult<u64> {
        let file = tokio::fs::File::open(local_path).await?;
        let metadata = file.metadata().await?;
        let size = metadata.len();
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let response = self
            .authorize(self.client.put(self.endpoint("/api/fs/put")))
            .header("File-Path", encode_file_path(remote_path))
            .header("Last-Modified", last_modified.to_string())
            .header("Overwrite", "false")
            .header(CONTENT_LENGTH, size.to_string())
            .body(Body::from(file))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let accepted = matches!(status.as_u16(), 200 | 201 | 204);

        match serde_json::from_str::<StatusReply>(&text) {
            Ok(reply) if accepted && reply.code == CODE_OK => Ok(size),
            Ok(reply) if accepted => Err(ApiError::Api {
                code: reply.code,
                message: reply.message,
            }),
            Ok(_) => Err(ApiError::Status {
                status: status.as_u16(),
                body: preview(&text, BODY_PREVIEW).to_string(),
            }),
            Err(_) => Err(ApiError::Malformed(format!(
                "non-JSON upload response ({}): {}",
                status.as_u16(),
                preview(&text, BODY_PREVIEW)
            ))),
        }
    }
}

async fn ensure_ok(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    let text = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body: preview(&text, BODY_PREVIEW).to_string(),
    })
}

fn preview(text: &str, max: usize) -> &str {
    if text.is_empty() {
        "Empty response"
    } else {
        truncate_body(text, max)
    }
}

/// Percent-encode a remote path for the `File-Path` header.
pub fn encode_file_path(path: &str) -> String {
    utf8_percent_encode(path, FILE_PATH_ENCODE_SET).to_string()
}
