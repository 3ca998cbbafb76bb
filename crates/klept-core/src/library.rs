//! Application controller
//!
//! The `Library` is the single entry point the presentation layer talks to.
//! It owns the [`Reconciler`] (state plus sync) and the [`TitleResolver`],
//! and turns user intents into whole-collection updates:
//!
//! ```ignore
//! let library = Library::open()?;
//! library.auto_pull().await;
//!
//! let (bookmark, sync) = library
//!     .add_bookmark(NewBookmark::new("example.com"))
//!     .await?;
//! sync.wait().await;
//! ```
//!
//! Every mutation persists locally before returning. The returned
//! [`SyncTask`] covers the remote push and may be awaited or dropped.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{normalize_url, Bookmark, Settings};
use crate::remote::{GistClient, RemoteStore};
use crate::storage::LocalStore;
use crate::sync::{Reconciler, SyncOutcome, SyncStatus, SyncTask};
use crate::title::{ResolvedTitle, TitleResolver, TitleSource};
use crate::view::{self, ViewQuery};

/// Input for a new bookmark
#[derive(Debug, Clone, Default)]
pub struct NewBookmark {
    pub url: String,
    /// Resolved from the page when `None` or blank
    pub title: Option<String>,
    pub tags: Vec<String>,
}

impl NewBookmark {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Visible and total bookmark counts for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub visible: usize,
    pub total: usize,
}

/// Bookmark library: local collection, settings, and sync
pub struct Library {
    reconciler: Arc<Reconciler>,
    titles: TitleResolver,
    config: Config,
}

impl Library {
    /// Open the library with configuration from the default location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the library against the gist API
    pub fn open_with_config(config: Config) -> Result<Self> {
        let remote = GistClient::new(&config).context("Failed to create gist client")?;
        Self::open_with_remote(config, Arc::new(remote))
    }

    /// Open the library with a specific remote backend
    pub fn open_with_remote(config: Config, remote: Arc<dyn RemoteStore>) -> Result<Self> {
        let local = LocalStore::new(&config);
        let titles = TitleResolver::new(&config).context("Failed to create title resolver")?;
        let reconciler = Reconciler::new(local, remote, config.status_display_interval());

        Ok(Self {
            reconciler,
            titles,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    // ==================== State ====================

    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.reconciler.bookmarks()
    }

    pub fn settings(&self) -> Settings {
        self.reconciler.settings()
    }

    pub fn status(&self) -> SyncStatus {
        self.reconciler.status()
    }

    pub fn last_error(&self) -> Option<String> {
        self.reconciler.last_error()
    }

    pub fn subscribe_bookmarks(&self) -> watch::Receiver<Vec<Bookmark>> {
        self.reconciler.subscribe_bookmarks()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.reconciler.subscribe_status()
    }

    /// Find a bookmark by exact id or unique id prefix
    pub fn find(&self, id: &str) -> Result<Bookmark> {
        let bookmarks = self.bookmarks();
        if let Some(exact) = bookmarks.iter().find(|b| b.id == id) {
            return Ok(exact.clone());
        }

        let mut matches = bookmarks.into_iter().filter(|b| b.id.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (Some(_), Some(_)) => bail!("Ambiguous bookmark id '{}': matches several bookmarks", id),
            (None, _) => bail!("Bookmark not found: {}", id),
        }
    }

    // ==================== Queries ====================

    /// Ordered, filtered bookmarks for display
    pub fn view(&self, query: &ViewQuery) -> Vec<Bookmark> {
        let bookmarks = self.bookmarks();
        view::visible_bookmarks(&bookmarks, query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn all_tags(&self) -> Vec<String> {
        view::all_tags(&self.bookmarks())
    }

    /// Tags with the number of bookmarks carrying each
    pub fn tags_with_counts(&self) -> Vec<(String, usize)> {
        let bookmarks = self.bookmarks();
        view::all_tags(&bookmarks)
            .into_iter()
            .map(|tag| {
                let count = bookmarks.iter().filter(|b| b.has_tag(&tag)).count();
                (tag, count)
            })
            .collect()
    }

    pub fn counts(&self, query: &ViewQuery) -> Counts {
        let bookmarks = self.bookmarks();
        Counts {
            visible: view::visible_bookmarks(&bookmarks, query).len(),
            total: bookmarks.len(),
        }
    }

    // ==================== Mutations ====================

    /// Add a bookmark at the front of the collection
    ///
    /// The URL is normalized; a missing title is looked up from the page,
    /// falling back to the host name.
    pub async fn add_bookmark(&self, input: NewBookmark) -> Result<(Bookmark, SyncTask)> {
        let url = normalize_url(&input.url);
        if url.is_empty() {
            bail!("URL is required");
        }

        let title = match input.title.filter(|t| !t.trim().is_empty()) {
            Some(title) => title.trim().to_string(),
            None => {
                let ResolvedTitle { title, source } = self.titles.resolve(&url).await;
                if source == TitleSource::Fallback {
                    debug!("Using fallback title '{}' for {}", title, url);
                }
                title
            }
        };

        let mut bookmark = Bookmark::new(&url);
        bookmark.set_title(title);
        bookmark.set_tags(input.tags);

        let added = bookmark.clone();
        let ((), sync) = self
            .reconciler
            .modify_bookmarks(move |bookmarks| bookmarks.insert(0, bookmark));
        info!("Added bookmark {} ({})", added.id, added.url);
        Ok((added, sync))
    }

    /// Replace every entry sharing the bookmark's id
    ///
    /// Returns whether anything was replaced.
    pub fn update_bookmark(&self, mut updated: Bookmark) -> (bool, SyncTask) {
        let tags = std::mem::take(&mut updated.tags);
        updated.set_tags(tags);
        self.reconciler.modify_bookmarks(|bookmarks| {
            let mut replaced = false;
            for existing in bookmarks.iter_mut().filter(|b| b.id == updated.id) {
                *existing = updated.clone();
                replaced = true;
            }
            replaced
        })
    }

    /// Remove every entry with this id; returns how many were removed
    pub fn delete_bookmark(&self, id: &str) -> (usize, SyncTask) {
        self.reconciler.modify_bookmarks(|bookmarks| {
            let before = bookmarks.len();
            bookmarks.retain(|b| b.id != id);
            before - bookmarks.len()
        })
    }

    /// Flip the pinned flag; returns the new state, or `None` if not found
    pub fn toggle_pin(&self, id: &str) -> (Option<bool>, SyncTask) {
        self.reconciler.modify_bookmarks(|bookmarks| {
            let mut pinned = None;
            for bookmark in bookmarks.iter_mut().filter(|b| b.id == id) {
                bookmark.toggle_pin();
                pinned = Some(bookmark.pinned);
            }
            pinned
        })
    }

    /// Replace the settings; configured sync triggers a pull
    pub fn save_settings(&self, settings: Settings) -> SyncTask {
        self.reconciler.save_settings(settings)
    }

    /// Reconcile with the remote (start-up pull, or a manual sync)
    pub async fn auto_pull(&self) -> SyncOutcome {
        self.reconciler.auto_pull().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::SyncError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryRemote {
        stored: Mutex<Vec<Bookmark>>,
    }

    #[async_trait]
    impl RemoteStore for MemoryRemote {
        async fn pull(&self, _settings: &Settings) -> Result<Vec<Bookmark>, SyncError> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn push(&self, bookmarks: &[Bookmark], _settings: &Settings) -> Result<(), SyncError> {
            *self.stored.lock().unwrap() = bookmarks.to_vec();
            Ok(())
        }
    }

    fn test_library(temp_dir: &TempDir, remote: Arc<MemoryRemote>) -> Library {
        let mut config = Config::with_data_dir(temp_dir.path());
        config.status_display_ms = 20;
        // Unroutable relay so title lookups fall back quickly
        config.title_proxy_url = "http://127.0.0.1:9/get".to_string();
        config.http_timeout_secs = 2;
        Library::open_with_remote(config, remote).unwrap()
    }

    fn sync_settings() -> Settings {
        Settings {
            gist_id: "gist".to_string(),
            github_token: "token".to_string(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_add_bookmark_normalizes_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));

        let (bookmark, sync) = library
            .add_bookmark(
                NewBookmark::new("example.com")
                    .with_title("Example")
                    .with_tags(vec!["web".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(bookmark.url, "https://example.com");
        assert_eq!(bookmark.title, "Example");
        assert!(!sync.is_scheduled());

        let reloaded = LocalStore::new(library.config()).load_bookmarks();
        assert_eq!(reloaded, vec![bookmark]);
    }

    #[tokio::test]
    async fn test_add_bookmark_prepends() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));

        library
            .add_bookmark(NewBookmark::new("a.example").with_title("A"))
            .await
            .unwrap();
        library
            .add_bookmark(NewBookmark::new("b.example").with_title("B"))
            .await
            .unwrap();

        let titles: Vec<_> = library.bookmarks().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_add_bookmark_falls_back_to_host_title() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));

        let (bookmark, _) = library
            .add_bookmark(NewBookmark::new("https://www.example.org/page").with_title("  "))
            .await
            .unwrap();

        assert_eq!(bookmark.title, "www.example.org");
    }

    #[tokio::test]
    async fn test_add_bookmark_requires_url() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));

        assert!(library.add_bookmark(NewBookmark::new("   ")).await.is_err());
        assert!(library.bookmarks().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_push_when_sync_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::default());
        let library = test_library(&temp_dir, remote.clone());
        library.save_settings(sync_settings()).wait().await;

        let (bookmark, sync) = library
            .add_bookmark(NewBookmark::new("rust-lang.org").with_title("Rust"))
            .await
            .unwrap();
        assert!(sync.is_scheduled());
        sync.wait().await;
        assert_eq!(remote.stored.lock().unwrap().clone(), vec![bookmark.clone()]);

        let (pinned, sync) = library.toggle_pin(&bookmark.id);
        assert_eq!(pinned, Some(true));
        sync.wait().await;
        assert!(remote.stored.lock().unwrap()[0].pinned);

        let (removed, sync) = library.delete_bookmark(&bookmark.id);
        assert_eq!(removed, 1);
        sync.wait().await;
        assert!(remote.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_bookmark_replaces_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));
        let (mut bookmark, _) = library
            .add_bookmark(NewBookmark::new("a.example").with_title("A"))
            .await
            .unwrap();

        bookmark.set_title("Renamed");
        bookmark.set_url("b.example");
        let (replaced, _) = library.update_bookmark(bookmark.clone());

        assert!(replaced);
        assert_eq!(library.bookmarks(), vec![bookmark]);

        let (replaced, _) = library.update_bookmark(Bookmark::with_id("missing", "https://x", 0));
        assert!(!replaced);
        assert_eq!(library.bookmarks().len(), 1);
    }

    #[tokio::test]
    async fn test_tags_are_trimmed_on_add_and_update() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));

        let (mut bookmark, _) = library
            .add_bookmark(
                NewBookmark::new("a.example")
                    .with_title("A")
                    .with_tags(vec![" rust ".to_string(), "".to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(bookmark.tags, vec!["rust"]);
        assert_eq!(library.all_tags(), vec!["rust"]);
        assert_eq!(library.view(&ViewQuery::new("", Some("rust".to_string()))).len(), 1);

        bookmark.tags = vec!["  ".to_string(), " cli".to_string()];
        library.update_bookmark(bookmark.clone());
        assert_eq!(library.bookmarks()[0].tags, vec!["cli"]);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_noops() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));

        assert_eq!(library.toggle_pin("nope").0, None);
        assert_eq!(library.delete_bookmark("nope").0, 0);
    }

    #[tokio::test]
    async fn test_find_by_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));
        library.reconciler().update_bookmarks(vec![
            Bookmark::with_id("abc123", "https://a.example", 1),
            Bookmark::with_id("abd456", "https://b.example", 2),
        ]);

        assert_eq!(library.find("abc").unwrap().id, "abc123");
        assert_eq!(library.find("abd456").unwrap().id, "abd456");
        assert!(library.find("ab").is_err());
        assert!(library.find("zzz").is_err());
    }

    #[tokio::test]
    async fn test_view_counts_and_tags() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));
        for (url, tags) in [("a.example", "rust, cli"), ("b.example", "rust"), ("c.example", "")] {
            library
                .add_bookmark(
                    NewBookmark::new(url)
                        .with_title(url)
                        .with_tags(crate::models::parse_tags(tags)),
                )
                .await
                .unwrap();
        }

        let query = ViewQuery::new("", Some("rust".to_string()));
        let view = library.view(&query);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].title, "a.example");
        assert_eq!(library.counts(&query), Counts { visible: 2, total: 3 });
        assert_eq!(library.all_tags(), vec!["cli", "rust"]);
        assert_eq!(
            library.tags_with_counts(),
            vec![("cli".to_string(), 1), ("rust".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_status_returns_to_idle_after_sync() {
        let temp_dir = TempDir::new().unwrap();
        let library = test_library(&temp_dir, Arc::new(MemoryRemote::default()));
        library.save_settings(sync_settings()).wait().await;
        assert_eq!(library.status(), SyncStatus::Success);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(library.status(), SyncStatus::Idle);
    }
}
