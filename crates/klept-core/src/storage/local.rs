//! Local record persistence
//!
//! Stores the bookmark collection and the user settings as two JSON records
//! in the data directory:
//! - `bookmarks.json` - JSON array of bookmarks
//! - `settings.json` - JSON object with sync credentials and theme
//!
//! Reads never fail: a missing or corrupt record degrades to its default.
//! Writes replace the whole record atomically (temp file, then rename).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::models::{Bookmark, Settings};

/// Durable store for the bookmark list and settings
#[derive(Debug, Clone)]
pub struct LocalStore {
    bookmarks_path: PathBuf,
    settings_path: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the configured data directory
    pub fn new(config: &Config) -> Self {
        Self {
            bookmarks_path: config.bookmarks_path(),
            settings_path: config.settings_path(),
        }
    }

    /// Load both records
    pub fn load(&self) -> (Vec<Bookmark>, Settings) {
        (self.load_bookmarks(), self.load_settings())
    }

    /// Load the bookmark collection, or an empty list
    pub fn load_bookmarks(&self) -> Vec<Bookmark> {
        load_or_default(&self.bookmarks_path)
    }

    /// Load settings, or defaults
    pub fn load_settings(&self) -> Settings {
        load_or_default(&self.settings_path)
    }

    /// Replace the stored bookmark collection
    pub fn save_bookmarks(&self, bookmarks: &[Bookmark]) -> StorageResult<()> {
        write_record(&self.bookmarks_path, bookmarks)?;
        debug!("Saved {} bookmarks to {:?}", bookmarks.len(), self.bookmarks_path);
        Ok(())
    }

    /// Replace the stored settings
    pub fn save_settings(&self, settings: &Settings) -> StorageResult<()> {
        write_record(&self.settings_path, settings)
    }

    /// Path of the bookmark record
    pub fn bookmarks_path(&self) -> &Path {
        &self.bookmarks_path
    }

    /// Path of the settings record
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_record(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            warn!("{}; using defaults", e);
            T::default()
        }
    }
}

/// Read and parse a record; `None` if it doesn't exist
fn read_record<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
}

fn write_record<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &json)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Same directory so the rename stays atomic
    let temp_path = path.with_extension("json.tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_write(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::Replace {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;
    use tempfile::TempDir;

    fn test_store(temp_dir: &TempDir) -> LocalStore {
        LocalStore::new(&Config::with_data_dir(temp_dir.path()))
    }

    #[test]
    fn test_load_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let (bookmarks, settings) = store.load();
        assert!(bookmarks.is_empty());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.theme, Theme::System);
    }

    #[test]
    fn test_save_and_load_bookmarks() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let mut pinned = Bookmark::with_id("b", "https://b.example", 2).titled("B");
        pinned.pinned = true;
        pinned.tags = vec!["x".to_string(), "y".to_string()];
        let bookmarks = vec![
            Bookmark::with_id("a", "https://a.example", 1).titled("A"),
            pinned,
        ];

        store.save_bookmarks(&bookmarks).unwrap();
        assert!(store.bookmarks_path().exists());
        assert_eq!(store.load_bookmarks(), bookmarks);
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        store
            .save_bookmarks(&[
                Bookmark::with_id("a", "https://a.example", 1),
                Bookmark::with_id("b", "https://b.example", 2),
            ])
            .unwrap();
        store
            .save_bookmarks(&[Bookmark::with_id("c", "https://c.example", 3)])
            .unwrap();

        let loaded = store.load_bookmarks();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "c");
    }

    #[test]
    fn test_save_and_load_settings() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let settings = Settings {
            gist_id: "5d53f".to_string(),
            github_token: "ghp_abc".to_string(),
            theme: Theme::Dark,
        };
        store.save_settings(&settings).unwrap();

        assert_eq!(store.load_settings(), settings);
    }

    #[test]
    fn test_corrupt_bookmarks_degrade_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        fs::write(store.bookmarks_path(), "{ not json").unwrap();
        assert!(store.load_bookmarks().is_empty());
    }

    #[test]
    fn test_corrupt_settings_degrade_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        fs::write(store.settings_path(), "[1, 2, 3]").unwrap();
        assert_eq!(store.load_settings(), Settings::default());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        fs::write(store.settings_path(), r#"{"gistId":"abc"}"#).unwrap();
        let settings = store.load_settings();
        assert_eq!(settings.gist_id, "abc");
        assert!(settings.github_token.is_empty());
        assert_eq!(settings.theme, Theme::System);
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("a").join("b").join("bookmarks.json");

        atomic_write(&nested_path, b"[]").unwrap();

        assert!(nested_path.exists());
        assert!(!nested_path.with_extension("json.tmp").exists());
        assert_eq!(fs::read_to_string(&nested_path).unwrap(), "[]");
    }
}
