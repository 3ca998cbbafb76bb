//! Storage layer
//!
//! Persists the bookmark collection and the user settings to the local data
//! directory. Pure read/write: no reconciliation logic lives here.

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::LocalStore;
