//! Klept Core Library
//!
//! This crate provides the core functionality for Klept, a local-first
//! bookmark manager that can mirror its collection to a GitHub gist.
//!
//! # Architecture
//!
//! - **Local store**: JSON records in the data directory, always written first
//! - **Gist**: optional remote copy of the whole collection
//! - **Reconciler**: decides when to pull or push, and tracks sync status
//!
//! The collection is a flat list; display order is derived on demand.
//!
//! # Quick Start
//!
//! ```text
//! let library = Library::open()?;
//! library.auto_pull().await;
//!
//! let (bookmark, sync) = library.add_bookmark(NewBookmark::new("example.com")).await?;
//! let visible = library.view(&ViewQuery::default());
//! ```
//!
//! # Modules
//!
//! - `library`: Application controller (main entry point)
//! - `models`: Bookmarks, settings, and input helpers
//! - `storage`: Local JSON persistence
//! - `remote`: Gist backend
//! - `sync`: Reconciliation and sync status
//! - `view`: Filtering and ordering
//! - `title`: Page title lookup
//! - `deeplink`: Deep link parsing and the bookmarklet
//! - `config`: Application configuration

pub mod config;
pub mod deeplink;
pub mod library;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod title;
pub mod view;

pub use config::Config;
pub use deeplink::{bookmarklet, AddRequest, DeepLink};
pub use library::{Counts, Library, NewBookmark};
pub use models::{display_domain, normalize_url, parse_tags, Bookmark, Settings, Theme};
pub use remote::{GistClient, RemoteError, RemoteStore, SyncError};
pub use storage::{LocalStore, StorageError};
pub use sync::{Reconciler, SyncOutcome, SyncStatus, SyncTask};
pub use title::{ResolvedTitle, TitleResolver, TitleSource};
pub use view::{all_tags, visible_bookmarks, ViewQuery};
