//! Data models for Klept
//!
//! Defines the core data structures: Bookmark and Settings, plus the small
//! input helpers shared by every front-end (URL normalization, tag parsing).
//! Field names serialize in camelCase so stored and synced collections stay
//! readable by other clients of the same gist.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Opaque unique identifier
    pub id: String,
    /// Display title (resolved from the page when not given)
    #[serde(default)]
    pub title: String,
    /// The URL
    pub url: String,
    /// Creation time in epoch milliseconds
    pub created_at: i64,
    /// Pinned bookmarks sort ahead of everything else
    #[serde(default)]
    pub pinned: bool,
    /// Tags for organization
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Bookmark {
    /// Create a new bookmark for the given URL
    ///
    /// The URL is normalized; the title starts empty until resolved.
    pub fn new(url: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            url: normalize_url(url),
            created_at: Utc::now().timestamp_millis(),
            pinned: false,
            tags: Vec::new(),
        }
    }

    /// Create a bookmark with explicit identity fields (for loading and tests)
    pub fn with_id(id: impl Into<String>, url: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            url: url.into(),
            created_at,
            pinned: false,
            tags: Vec::new(),
        }
    }

    /// Builder-style title setter
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Update the URL (normalized)
    pub fn set_url(&mut self, url: &str) {
        self.url = normalize_url(url);
    }

    /// Set all tags (replacing existing), trimmed and without blanks
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    /// Flip the pinned flag
    pub fn toggle_pin(&mut self) {
        self.pinned = !self.pinned;
    }

    /// Whether the bookmark carries exactly this tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Color theme preference (presentation only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        };
        f.write_str(name)
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(format!(
                "Unknown theme '{}'. Use light, dark or system.",
                other
            )),
        }
    }
}

/// User settings
///
/// Sync is opt-in: it only runs when both the gist ID and the token are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// ID of the gist holding the remote copy
    pub gist_id: String,
    /// GitHub token used to read and write the gist
    pub github_token: String,
    /// Theme preference
    pub theme: Theme,
}

impl Settings {
    /// Whether both sync credentials are configured
    pub fn sync_enabled(&self) -> bool {
        !self.gist_id.is_empty() && !self.github_token.is_empty()
    }
}

/// Normalize user-entered URLs
///
/// Input that starts with a scheme is kept; anything else gets `https://`.
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() || has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// `scheme://` prefix, where a scheme is a letter then letters, digits, `+`, `-` or `.`
fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Parse a comma-separated tag list, dropping blanks
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Host of a URL without a leading `www.`, or empty if it doesn't parse
pub fn display_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
        })
        .unwrap_or_default()
}
