//! Remote sync adapter
//!
//! A [`RemoteStore`] holds a snapshot of the whole bookmark collection.
//! There is no partial update: `pull` returns everything, `push` replaces
//! everything. The gist implementation is [`GistClient`].
//!
//! An empty result from `pull` means the remote legitimately holds no data;
//! a failed fetch is always an error, never an empty collection.

mod error;
mod gist;

use async_trait::async_trait;

use crate::models::{Bookmark, Settings};

pub use error::{RemoteError, SyncError};
pub use gist::{decode_collection, encode_collection, GistClient};

/// Snapshot store for the bookmark collection
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the remote collection
    async fn pull(&self, settings: &Settings) -> Result<Vec<Bookmark>, SyncError>;

    /// Overwrite the remote collection
    async fn push(&self, bookmarks: &[Bookmark], settings: &Settings) -> Result<(), SyncError>;
}
