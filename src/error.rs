//! Error types for calls against the OpenList API.

use thiserror::Error;

/// Failure of a single API call.
///
/// Listing maps every variant to "stop this directory", transfers map every
/// variant to a failed item. Only login treats it as fatal.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or body transport failure.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the JSON shape the endpoint promises.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// HTTP 200 carrying a non-success application code.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The credential was rejected.
    #[error("unauthorized: token invalid or expired")]
    Unauthorized,

    /// Local file I/O during a transfer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Malformed(err.to_string())
        } else {
            ApiError::Transport(err)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Malformed(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Cut a response body down for diagnostics without splitting a UTF-8 char.
pub fn truncate_body(body: &str, max: usize) -> &str {
    if body.len() <= max {
        return body;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
