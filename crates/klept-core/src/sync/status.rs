//! Sync status and outcomes

use std::fmt;

/// Indicator reflecting the last sync attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// Pull or push in progress
    Syncing,
    /// Last attempt succeeded (shown briefly, then back to idle)
    Success,
    /// Last attempt failed (shown until the next attempt)
    Error,
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "sync",
            SyncStatus::Success => "synced",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a finished sync task did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Sync is not configured; nothing was sent
    Skipped,
    /// Remote was authoritative and replaced the local collection
    Pulled { count: usize },
    /// Local collection was written to the remote
    Pushed { count: usize },
    /// A later push already sent this state
    Superseded,
    /// The attempt failed; the status is now `Error`
    Failed(String),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}
