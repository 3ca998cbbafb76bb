//! Remote sync errors

use thiserror::Error;

/// Failure talking to the gist API
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network or client-side HTTP failure
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Token missing scope, expired or wrong
    #[error("GitHub rejected the token (HTTP {status}). Check the token has gist scope.")]
    Unauthorized { status: u16 },

    /// Gist does not exist or is not visible to the token
    #[error("Gist not found: '{gist_id}'")]
    NotFound { gist_id: String },

    /// Any other non-success status
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not what we expected
    #[error("Malformed response: {0}")]
    Parse(String),

    /// Collection could not be serialized
    #[error("Failed to serialize bookmarks: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors surfaced by the remote sync adapter
#[derive(Error, Debug)]
pub enum SyncError {
    /// Gist ID or token is empty
    #[error("Sync is not configured: set both a gist ID and a GitHub token")]
    NotConfigured,

    /// Reading the remote collection failed
    #[error("Failed to fetch remote bookmarks: {0}")]
    Fetch(#[source] RemoteError),

    /// Writing the remote collection failed
    #[error("Failed to write remote bookmarks: {0}")]
    Write(#[source] RemoteError),
}
