#![allow(dead_code)]

//! In-process OpenList stand-in for integration tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use openlist_sync::{Config, Credential, OpenListClient};

pub const TOKEN: &str = "test-token";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

#[derive(Clone, Debug)]
struct Node {
    name: String,
    is_dir: bool,
    size: u64,
}

/// One received upload.
#[derive(Clone, Debug)]
pub struct Upload {
    pub body: Vec<u8>,
    pub last_modified: Option<String>,
    pub overwrite: Option<String>,
    pub raw_file_path: String,
}

#[derive(Default)]
pub struct MockState {
    base_url: OnceLock<String>,
    children: Mutex<BTreeMap<String, Vec<Node>>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    /// Issue `raw_url` from fs/get
    pub direct_links: Mutex<bool>,
    /// Paths answered with HTTP 500 by list/get/stream
    pub failing: Mutex<HashSet<String>>,
    /// Directories whose page N (and later) fails
    pub failing_pages: Mutex<HashMap<String, u32>>,
    /// Paths whose fs/get answers 200 with a non-JSON body
    pub broken_get: Mutex<HashSet<String>>,
    /// Paths whose fs/get reports a different size than the content
    pub size_override: Mutex<HashMap<String, u64>>,
    /// Upload paths rejected with an application error
    pub reject_uploads: Mutex<HashSet<String>>,
    /// Upload paths answered with an HTML gateway error
    pub html_uploads: Mutex<HashSet<String>>,
    /// Remote directories that already exist
    pub existing_dirs: Mutex<HashSet<String>>,

    pub list_calls: Mutex<Vec<(String, u32)>>,
    pub get_calls: Mutex<Vec<String>>,
    pub stream_calls: Mutex<Vec<String>>,
    pub raw_calls: Mutex<Vec<String>>,
    pub mkdir_calls: Mutex<Vec<String>>,
    pub uploads: Mutex<HashMap<String, Upload>>,
}

impl MockState {
    pub fn new() -> Self {
        let state = Self::default();
        state.children.lock().unwrap().insert("/".to_string(), Vec::new());
        state
    }

    /// Add a file with `size` deterministic bytes, creating parent dirs.
    pub fn file(self, path: &str, size: usize) -> Self {
        let body: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        self.file_with(path, body)
    }

    pub fn file_with(self, path: &str, body: Vec<u8>) -> Self {
        let (parent, name) = split(path);
        self.ensure_dir(parent);
        self.children.lock().unwrap().get_mut(parent).unwrap().push(Node {
            name: name.to_string(),
            is_dir: false,
            size: body.len() as u64,
        });
        self.contents.lock().unwrap().insert(path.to_string(), body);
        self
    }

    pub fn dir(self, path: &str) -> Self {
        self.ensure_dir(path);
        self
    }

    pub fn with_direct_links(self) -> Self {
        *self.direct_links.lock().unwrap() = true;
        self
    }

    fn ensure_dir(&self, path: &str) {
        if self.children.lock().unwrap().contains_key(path) {
            return;
        }
        let (parent, name) = split(path);
        self.ensure_dir(parent);
        let mut children = self.children.lock().unwrap();
        children.get_mut(parent).unwrap().push(Node {
            name: name.to_string(),
            is_dir: true,
            size: 0,
        });
        children.insert(path.to_string(), Vec::new());
    }

    fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.contents.lock().unwrap().get(path).cloned()
    }

    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn stream_count(&self, path: &str) -> usize {
        self.stream_calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn raw_count(&self, path: &str) -> usize {
        self.raw_calls.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn transfer_count(&self) -> usize {
        self.stream_calls.lock().unwrap().len() + self.raw_calls.lock().unwrap().len()
    }

    pub fn upload(&self, path: &str) -> Option<Upload> {
        self.uploads.lock().unwrap().get(path).cloned()
    }
}

fn split(path: &str) -> (&str, &str) {
    let idx = path.rfind('/').expect("absolute path");
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    (parent, &path[idx + 1..])
}

pub struct MockServer {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start(state: MockState) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        state.base_url.set(base_url.clone()).unwrap();

        let state = Arc::new(state);
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server crashed");
        });

        Self { base_url, state }
    }

    /// Client already carrying the test credential.
    pub fn client(&self) -> OpenListClient {
        OpenListClient::new(&self.base_url, Duration::from_secs(5))
            .unwrap()
            .with_credential(Credential::new(TOKEN))
    }

    pub fn config(&self, remote_path: &str, work_dir: &Path) -> Config {
        self.config_with(remote_path, work_dir, json!({}))
    }

    /// Config pointing at this server; `extra` keys override the defaults.
    pub fn config_with(&self, remote_path: &str, work_dir: &Path, extra: Value) -> Config {
        let mut raw = json!({
            "openlist_url": self.base_url,
            "username": USERNAME,
            "password": PASSWORD,
            "remote_path": remote_path,
            "local_save_dir": work_dir.join("downloads"),
            "manifest_path": work_dir.join("filelist.json"),
            "timeout": 5,
        });
        for (key, value) in extra.as_object().unwrap() {
            raw[key] = value.clone();
        }
        Config::from_json(&raw.to_string()).expect("valid test config")
    }
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/fs/list", post(list))
        .route("/api/fs/get", post(get_file))
        .route("/api/fs/stream", post(stream))
        .route("/api/fs/mkdir", post(mkdir))
        .route("/api/fs/put", put(upload))
        .route("/raw", get(raw))
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(TOKEN)
}

fn body_path(body: &Value) -> String {
    body["path"].as_str().unwrap_or_default().to_string()
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        Json(json!({"code": 200, "message": "success", "data": {"token": TOKEN}})).into_response()
    } else {
        Json(json!({"code": 400, "message": "password is incorrect", "data": null})).into_response()
    }
}

async fn list(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = body_path(&body);
    let page = body["page"].as_u64().unwrap_or(1) as u32;
    let per_page = body["per_page"].as_u64().unwrap_or(0) as usize;
    state.list_calls.lock().unwrap().push((path.clone(), page));

    if !authorized(&headers) {
        return Json(json!({"code": 401, "message": "token is invalidated"})).into_response();
    }
    if state.failing.lock().unwrap().contains(&path) {
        return server_error();
    }
    if let Some(bad) = state.failing_pages.lock().unwrap().get(&path) {
        if page >= *bad {
            return (StatusCode::OK, "<html>not json</html>").into_response();
        }
    }

    let children = state.children.lock().unwrap().get(&path).cloned();
    let Some(children) = children else {
        return Json(json!({"code": 500, "message": "object not found"})).into_response();
    };
    let content: Vec<Value> = children
        .iter()
        .skip((page as usize - 1) * per_page)
        .take(per_page)
        .map(|n| json!({"name": n.name, "is_dir": n.is_dir, "size": n.size}))
        .collect();
    let content = if content.is_empty() { Value::Null } else { Value::Array(content) };

    Json(json!({
        "code": 200,
        "message": "success",
        "data": {"content": content, "total": children.len()}
    }))
    .into_response()
}

async fn get_file(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = body_path(&body);
    state.get_calls.lock().unwrap().push(path.clone());

    if !authorized(&headers) {
        return Json(json!({"code": 401, "message": "token is invalidated"})).into_response();
    }
    if state.failing.lock().unwrap().contains(&path) {
        return server_error();
    }
    if state.broken_get.lock().unwrap().contains(&path) {
        return (StatusCode::OK, "<html>gateway</html>").into_response();
    }
    let Some(content) = state.content(&path) else {
        return Json(json!({"code": 500, "message": "object not found"})).into_response();
    };

    let size = state
        .size_override
        .lock()
        .unwrap()
        .get(&path)
        .copied()
        .unwrap_or(content.len() as u64);
    let raw_url = if *state.direct_links.lock().unwrap() {
        let base = state.base_url.get().unwrap();
        url::Url::parse_with_params(&format!("{}/raw", base), &[("path", &path)])
            .unwrap()
            .to_string()
    } else {
        String::new()
    };

    Json(json!({
        "code": 200,
        "message": "success",
        "data": {"name": split(&path).1, "size": size, "is_dir": false, "raw_url": raw_url}
    }))
    .into_response()
}

async fn stream(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = body_path(&body);
    state.stream_calls.lock().unwrap().push(path.clone());

    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.failing.lock().unwrap().contains(&path) {
        return server_error();
    }
    match state.content(&path) {
        Some(content) => content.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn raw(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = query.get("path").cloned().unwrap_or_default();
    state.raw_calls.lock().unwrap().push(path.clone());

    // Direct links are pre-signed; a leaked API token is a test failure.
    if headers.contains_key("authorization") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    match state.content(&path) {
        Some(content) => content.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn mkdir(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = body_path(&body);
    state.mkdir_calls.lock().unwrap().push(path.clone());

    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "message": "token is invalidated"})),
        )
            .into_response();
    }
    let mut existing = state.existing_dirs.lock().unwrap();
    if !existing.insert(path.clone()) {
        return Json(json!({"code": 500, "message": format!("{} already exists", path)}))
            .into_response();
    }
    Json(json!({"code": 200, "message": "success", "data": null})).into_response()
}

async fn upload(State(state): State<Arc<MockState>>, headers: HeaderMap, body: Bytes) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let raw_file_path = header("file-path").unwrap_or_default();
    let path = percent_encoding::percent_decode_str(&raw_file_path)
        .decode_utf8()
        .unwrap()
        .into_owned();

    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "message": "token is invalidated"})),
        )
            .into_response();
    }
    if state.html_uploads.lock().unwrap().contains(&path) {
        return (StatusCode::BAD_GATEWAY, "<html>502 Bad Gateway</html>").into_response();
    }
    if state.reject_uploads.lock().unwrap().contains(&path) {
        return Json(json!({"code": 403, "message": "permission denied"})).into_response();
    }

    state.uploads.lock().unwrap().insert(
        path,
        Upload {
            body: body.to_vec(),
            last_modified: header("last-modified"),
            overwrite: header("overwrite"),
            raw_file_path,
        },
    );
    Json(json!({"code": 200, "message": "success", "data": null})).into_response()
}
