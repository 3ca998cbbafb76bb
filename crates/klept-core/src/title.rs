//! Page title lookup
//!
//! Titles are fetched through a CORS relay that wraps the target page in a
//! JSON envelope (`{"contents": "<html>..."}`). Lookup is best effort: any
//! failure degrades to the URL's host name.

use std::time::Duration;

use scraper::{Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// Failure fetching or parsing a page title
#[derive(Error, Debug)]
pub enum TitleError {
    #[error("Title request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Title relay returned HTTP {0}")]
    Status(u16),

    #[error("Page has no usable <title>")]
    Missing,
}

/// Where a resolved title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    Page,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTitle {
    pub title: String,
    pub source: TitleSource,
}

/// Relay response envelope
#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    contents: Option<String>,
}

/// Fetches titles for new bookmarks
#[derive(Debug, Clone)]
pub struct TitleResolver {
    http: reqwest::Client,
    proxy_url: String,
}

impl TitleResolver {
    pub fn new(config: &Config) -> Result<Self, TitleError> {
        Self::with_proxy(&config.title_proxy_url, config.http_timeout())
    }

    pub fn with_proxy(proxy_url: &str, timeout: Duration) -> Result<Self, TitleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("klept/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            proxy_url: proxy_url.to_string(),
        })
    }

    /// Resolve a title for `url`, never failing
    pub async fn resolve(&self, url: &str) -> ResolvedTitle {
        match self.fetch(url).await {
            Ok(title) => {
                debug!("Resolved title for {}: {}", url, title);
                ResolvedTitle {
                    title,
                    source: TitleSource::Page,
                }
            }
            Err(e) => {
                warn!("Failed to fetch title for {}, using fallback: {}", url, e);
                ResolvedTitle {
                    title: fallback_title(url),
                    source: TitleSource::Fallback,
                }
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, TitleError> {
        let response = self
            .http
            .get(&self.proxy_url)
            .query(&[("url", url)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TitleError::Status(response.status().as_u16()));
        }

        let relay: RelayResponse = response.json().await?;
        relay
            .contents
            .as_deref()
            .and_then(extract_title)
            .ok_or(TitleError::Missing)
    }
}

/// Text of the first `<title>` element, trimmed; `None` if absent or blank
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Host name of the URL, or the URL itself if it doesn't parse
pub fn fallback_title(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
