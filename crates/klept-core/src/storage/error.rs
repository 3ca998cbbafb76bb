//! Storage errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing a local record
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Record exists but is not valid JSON for its type
    #[error("Record '{path}' is corrupt: {details}")]
    Corrupt { path: PathBuf, details: String },

    #[error("Cannot encode record for '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No permission to write '{path}'. Check the data directory permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Out of disk space writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The finished temp file could not replace the record
    #[error("Cannot replace '{to}' with '{from}': {source}")]
    Replace {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify a failed write
    pub fn from_write(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied {
                path,
                source: error,
            }
        } else if is_out_of_space(&error) {
            StorageError::DiskFull {
                path,
                source: error,
            }
        } else {
            StorageError::Write {
                path,
                source: error,
            }
        }
    }
}

// ENOSPC is 28 on Linux and macOS
fn is_out_of_space(error: &io::Error) -> bool {
    error.raw_os_error() == Some(28) || error.to_string().to_lowercase().contains("no space left")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failure_classification() {
        let path = PathBuf::from("/data/bookmarks.json");

        let err = StorageError::from_write(
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            path.clone(),
        );
        assert!(matches!(err, StorageError::PermissionDenied { .. }));

        let err = StorageError::from_write(io::Error::from_raw_os_error(28), path.clone());
        assert!(matches!(err, StorageError::DiskFull { .. }));

        let err = StorageError::from_write(io::Error::new(io::ErrorKind::Other, "device went away"), path);
        assert!(matches!(err, StorageError::Write { .. }));
    }

    #[test]
    fn test_corrupt_display() {
        let err = StorageError::Corrupt {
            path: PathBuf::from("/data/settings.json"),
            details: "expected value at line 1 column 1".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("corrupt"));
        assert!(msg.contains("settings.json"));
    }
}
