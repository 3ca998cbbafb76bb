//! GitHub gist backend
//!
//! The whole bookmark collection lives as pretty-printed JSON in one file of
//! a gist. Pulling reads that file; pushing overwrites it with a single
//! `PATCH`. Other files in the gist are left alone.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{RemoteError, SyncError};
use super::RemoteStore;
use crate::config::Config;
use crate::models::{Bookmark, Settings};

const USER_AGENT: &str = concat!("klept/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Longest error body kept in [`RemoteError::Status`]
const MAX_ERROR_BODY: usize = 200;

/// A gist as returned by `GET /gists/{id}`, reduced to what we read
#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: HashMap<String, Option<GistFile>>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

/// Body of `PATCH /gists/{id}`
#[derive(Debug, Serialize)]
struct GistUpdate<'a> {
    files: HashMap<&'a str, FileUpdate>,
}

#[derive(Debug, Serialize)]
struct FileUpdate {
    content: String,
}

/// Where the collection file's content can be found
#[derive(Debug, PartialEq, Eq)]
enum FileContent {
    /// The gist has no such file
    Missing,
    /// Content was returned inline
    Inline(String),
    /// Content exceeds the API's inline limit; fetch from here
    Truncated { raw_url: String },
}

/// Gist-backed [`RemoteStore`]
pub struct GistClient {
    http: reqwest::Client,
    api_url: String,
    file_name: String,
}

impl GistClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(RemoteError::Transport)?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            file_name: config.gist_file.clone(),
        })
    }

    /// Name of the collection file inside the gist
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn gist_url(&self, gist_id: &str) -> String {
        format!("{}/gists/{}", self.api_url, gist_id)
    }

    fn authorized(&self, request: reqwest::RequestBuilder, settings: &Settings) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", settings.github_token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn fetch_content(&self, settings: &Settings) -> Result<String, RemoteError> {
        let response = self
            .authorized(self.http.get(self.gist_url(&settings.gist_id)), settings)
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let body = check_status(response, &settings.gist_id)
            .await?
            .text()
            .await
            .map_err(RemoteError::Transport)?;

        match locate_file(&body, &self.file_name)? {
            FileContent::Missing => {
                debug!("Gist {} has no '{}' yet", settings.gist_id, self.file_name);
                Ok(String::new())
            }
            FileContent::Inline(content) => Ok(content),
            FileContent::Truncated { raw_url } => {
                debug!("'{}' is truncated, fetching {}", self.file_name, raw_url);
                let response = self
                    .authorized(self.http.get(&raw_url), settings)
                    .send()
                    .await
                    .map_err(RemoteError::Transport)?;
                check_status(response, &settings.gist_id)
                    .await?
                    .text()
                    .await
                    .map_err(RemoteError::Transport)
            }
        }
    }

    async fn write_content(&self, content: String, settings: &Settings) -> Result<(), RemoteError> {
        let mut files = HashMap::new();
        files.insert(self.file_name.as_str(), FileUpdate { content });

        let response = self
            .authorized(self.http.patch(self.gist_url(&settings.gist_id)), settings)
            .json(&GistUpdate { files })
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        check_status(response, &settings.gist_id).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for GistClient {
    async fn pull(&self, settings: &Settings) -> Result<Vec<Bookmark>, SyncError> {
        if !settings.sync_enabled() {
            return Err(SyncError::NotConfigured);
        }

        let content = self.fetch_content(settings).await.map_err(SyncError::Fetch)?;
        let bookmarks = decode_collection(&content).map_err(SyncError::Fetch)?;
        info!("Pulled {} bookmarks from gist {}", bookmarks.len(), settings.gist_id);
        Ok(bookmarks)
    }

    async fn push(&self, bookmarks: &[Bookmark], settings: &Settings) -> Result<(), SyncError> {
        if !settings.sync_enabled() {
            return Err(SyncError::NotConfigured);
        }

        let content = encode_collection(bookmarks).map_err(SyncError::Write)?;
        self.write_content(content, settings)
            .await
            .map_err(SyncError::Write)?;
        info!("Pushed {} bookmarks to gist {}", bookmarks.len(), settings.gist_id);
        Ok(())
    }
}

/// Map non-success responses onto [`RemoteError`]
async fn check_status(
    response: reqwest::Response,
    gist_id: &str,
) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 | 403 => Err(RemoteError::Unauthorized {
            status: status.as_u16(),
        }),
        404 => Err(RemoteError::NotFound {
            gist_id: gist_id.to_string(),
        }),
        code => {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| body.is_char_boundary(i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            Err(RemoteError::Status { status: code, body })
        }
    }
}

/// Find the collection file in a gist response body
fn locate_file(body: &str, file_name: &str) -> Result<FileContent, RemoteError> {
    let gist: Gist = serde_json::from_str(body)
        .map_err(|e| RemoteError::Parse(format!("gist response: {}", e)))?;

    let Some(Some(file)) = gist.files.get(file_name) else {
        return Ok(FileContent::Missing);
    };

    match (&file.raw_url, file.truncated) {
        (Some(raw_url), true) => Ok(FileContent::Truncated {
            raw_url: raw_url.clone(),
        }),
        _ => Ok(FileContent::Inline(file.content.clone().unwrap_or_default())),
    }
}

/// Serialize a collection into the gist file format
pub fn encode_collection(bookmarks: &[Bookmark]) -> Result<String, RemoteError> {
    serde_json::to_string_pretty(bookmarks).map_err(RemoteError::Serialize)
}

/// Parse the gist file content
///
/// Blank content and a JSON `null` both mean "no data yet".
pub fn decode_collection(content: &str) -> Result<Vec<Bookmark>, RemoteError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Option<Vec<Bookmark>>>(content)
        .map(Option::unwrap_or_default)
        .map_err(|e| RemoteError::Parse(format!("bookmark collection: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn sample_collection() -> Vec<Bookmark> {
        let mut rust = Bookmark::with_id("1", "https://rust-lang.org", 100).titled("Rust");
        rust.tags = vec!["lang".to_string(), "systems".to_string()];
        rust.pinned = true;
        let mut docs = Bookmark::with_id("2", "https://docs.rs", 200).titled("Docs.rs");
        docs.tags = vec!["reference".to_string()];
        vec![rust, docs]
    }

    #[test]
    fn test_collection_round_trip() {
        let bookmarks = sample_collection();
        let encoded = encode_collection(&bookmarks).unwrap();
        let decoded = decode_collection(&encoded).unwrap();

        assert_eq!(decoded, bookmarks);
        assert_eq!(decoded[0].tags, vec!["lang", "systems"]);
    }

    #[test]
    fn test_decode_empty_content() {
        assert!(decode_collection("").unwrap().is_empty());
        assert!(decode_collection("  \n").unwrap().is_empty());
        assert!(decode_collection("null").unwrap().is_empty());
        assert!(decode_collection("[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_malformed_content_is_error() {
        let err = decode_collection("{\"not\": \"a list\"}").unwrap_err();
        assert!(matches!(err, RemoteError::Parse(_)));
    }

    #[test]
    fn test_locate_inline_file() {
        let body = serde_json::json!({
            "id": "abc",
            "files": {
                "bookmarks.json": {
                    "filename": "bookmarks.json",
                    "content": "[]",
                    "truncated": false,
                    "raw_url": "https://gist.githubusercontent.com/raw/bookmarks.json"
                },
                "README.md": { "content": "hello" }
            }
        })
        .to_string();

        assert_eq!(
            locate_file(&body, "bookmarks.json").unwrap(),
            FileContent::Inline("[]".to_string())
        );
    }

    #[test]
    fn test_locate_missing_file() {
        let body = r#"{"files": {"other.txt": {"content": "x"}}}"#;
        assert_eq!(locate_file(body, "bookmarks.json").unwrap(), FileContent::Missing);

        let body = r#"{"files": {}}"#;
        assert_eq!(locate_file(body, "bookmarks.json").unwrap(), FileContent::Missing);
    }

    #[test]
    fn test_locate_truncated_file() {
        let body = r#"{"files": {"bookmarks.json": {
            "content": "[{\"id\":",
            "truncated": true,
            "raw_url": "https://gist.githubusercontent.com/u/abc/raw/bookmarks.json"
        }}}"#;

        assert_eq!(
            locate_file(body, "bookmarks.json").unwrap(),
            FileContent::Truncated {
                raw_url: "https://gist.githubusercontent.com/u/abc/raw/bookmarks.json".to_string()
            }
        );
    }

    #[test]
    fn test_locate_malformed_body() {
        let err = locate_file("<html>rate limited</html>", "bookmarks.json").unwrap_err();
        assert!(matches!(err, RemoteError::Parse(_)));
    }

    #[test]
    fn test_update_body_shape() {
        let mut files = HashMap::new();
        files.insert(
            "bookmarks.json",
            FileUpdate {
                content: "[]".to_string(),
            },
        );
        let json = serde_json::to_value(GistUpdate { files }).unwrap();
        assert_eq!(json["files"]["bookmarks.json"]["content"], "[]");
    }

    #[test]
    fn test_gist_url() {
        let mut config = Config::with_data_dir("/tmp/klept");
        config.api_url = "http://localhost:9000/".to_string();
        let client = GistClient::new(&config).unwrap();

        assert_eq!(client.gist_url("abc"), "http://localhost:9000/gists/abc");
        assert_eq!(client.file_name(), "bookmarks.json");
    }

    #[tokio::test]
    async fn test_unconfigured_settings_skip_io() {
        let client = GistClient::new(&Config::with_data_dir("/tmp/klept")).unwrap();
        let settings = Settings::default();

        assert!(matches!(
            client.pull(&settings).await,
            Err(SyncError::NotConfigured)
        ));
        assert!(matches!(
            client.push(&[], &settings).await,
            Err(SyncError::NotConfigured)
        ));
    }

    // ==================== HTTP ====================

    fn gist_settings() -> Settings {
        Settings {
            gist_id: "abc".to_string(),
            github_token: "secret".to_string(),
            ..Settings::default()
        }
    }

    fn client_for(base: &str) -> GistClient {
        let mut config = Config::with_data_dir("/tmp/klept");
        config.api_url = base.to_string();
        config.http_timeout_secs = 5;
        GistClient::new(&config).unwrap()
    }

    fn gist_body(file: serde_json::Value) -> String {
        serde_json::json!({ "id": "abc", "files": { "bookmarks.json": file } }).to_string()
    }

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    /// Answer one connection per canned response, returning the raw requests
    fn respond(listener: TcpListener, responses: Vec<(u16, String)>) -> JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            requests
        })
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn request_body(request: &str) -> &str {
        request.split_once("\r\n\r\n").map_or("", |(_, body)| body)
    }

    #[tokio::test]
    async fn test_pull_inline_file_sends_credentials() {
        let (listener, base) = bind().await;
        let content = encode_collection(&sample_collection()).unwrap();
        let server = respond(
            listener,
            vec![(200, gist_body(serde_json::json!({ "content": content, "truncated": false })))],
        );

        let pulled = client_for(&base).pull(&gist_settings()).await.unwrap();
        assert_eq!(pulled, sample_collection());

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("GET /gists/abc "));
        let lowered = requests[0].to_lowercase();
        assert!(lowered.contains("authorization: token secret"));
        assert!(lowered.contains("accept: application/vnd.github+json"));
    }

    #[tokio::test]
    async fn test_pull_gist_without_file_is_empty() {
        let (listener, base) = bind().await;
        let body = serde_json::json!({ "id": "abc", "files": { "notes.md": { "content": "hi" } } });
        let server = respond(listener, vec![(200, body.to_string())]);

        let pulled = client_for(&base).pull(&gist_settings()).await.unwrap();
        assert!(pulled.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_pull_follows_raw_url_when_truncated() {
        let (listener, base) = bind().await;
        let raw_url = format!("{}/raw/bookmarks.json", base);
        let full = encode_collection(&sample_collection()).unwrap();
        let server = respond(
            listener,
            vec![
                (
                    200,
                    gist_body(serde_json::json!({
                        "content": &full[..10],
                        "truncated": true,
                        "raw_url": raw_url
                    })),
                ),
                (200, full),
            ],
        );

        let pulled = client_for(&base).pull(&gist_settings()).await.unwrap();
        assert_eq!(pulled, sample_collection());

        let requests = server.await.unwrap();
        assert!(requests[1].starts_with("GET /raw/bookmarks.json "));
        assert!(requests[1].to_lowercase().contains("authorization: token secret"));
    }

    #[tokio::test]
    async fn test_pull_failures_are_errors_not_empty() {
        let long_body = "x".repeat(500);
        let cases = [(401, String::new()), (403, String::new()), (404, String::new()), (502, long_body)];

        for (status, body) in cases {
            let (listener, base) = bind().await;
            let server = respond(listener, vec![(status, body)]);

            let err = client_for(&base).pull(&gist_settings()).await.unwrap_err();
            match (status, err) {
                (401 | 403, SyncError::Fetch(RemoteError::Unauthorized { status: got })) => {
                    assert_eq!(got, status)
                }
                (404, SyncError::Fetch(RemoteError::NotFound { gist_id })) => {
                    assert_eq!(gist_id, "abc")
                }
                (502, SyncError::Fetch(RemoteError::Status { status: 502, body })) => {
                    assert!(body.len() <= MAX_ERROR_BODY)
                }
                (status, err) => panic!("HTTP {} mapped to {:?}", status, err),
            }
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_pull_unreachable_is_transport_error() {
        let err = client_for("http://127.0.0.1:9").pull(&gist_settings()).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(RemoteError::Transport(_))));
    }

    #[tokio::test]
    async fn test_push_patches_collection_file() {
        let (listener, base) = bind().await;
        let server = respond(listener, vec![(200, "{}".to_string())]);

        client_for(&base)
            .push(&sample_collection(), &gist_settings())
            .await
            .unwrap();

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("PATCH /gists/abc "));
        let sent: serde_json::Value = serde_json::from_str(request_body(&requests[0])).unwrap();
        let content = sent["files"]["bookmarks.json"]["content"].as_str().unwrap();
        assert_eq!(decode_collection(content).unwrap(), sample_collection());
    }

    #[tokio::test]
    async fn test_push_rejected_token_is_write_error() {
        let (listener, base) = bind().await;
        let server = respond(listener, vec![(401, "{\"message\":\"Bad credentials\"}".to_string())]);

        let err = client_for(&base).push(&[], &gist_settings()).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Write(RemoteError::Unauthorized { status: 401 })
        ));
        server.await.unwrap();
    }
}
