//! Sync command handler

use anyhow::{bail, Result};

use klept_core::{Library, SyncOutcome};

use crate::output::Output;

/// Reconcile with the gist now
pub async fn sync(library: &Library, output: &Output) -> Result<()> {
    let settings = library.settings();
    if !settings.sync_enabled() {
        bail!(
            "Sync is not configured. Set it up with:\n  \
             klept settings set gist_id <gist id>\n  \
             klept settings set github_token <token with gist scope>"
        );
    }

    output.message(&format!("Syncing with gist {}...", settings.gist_id));

    match library.auto_pull().await {
        SyncOutcome::Pulled { count } => {
            output.success(&format!("Sync complete - {} bookmark(s) from gist", count));
        }
        SyncOutcome::Pushed { count } => {
            output.success(&format!("Sync complete - gist seeded with {} bookmark(s)", count));
        }
        SyncOutcome::Skipped | SyncOutcome::Superseded => {
            output.success("Sync complete - already up to date");
        }
        SyncOutcome::Failed(message) => bail!("Sync failed: {}", message),
    }

    Ok(())
}

/// Wait for a background push and report failures
pub async fn finish(task: klept_core::SyncTask, output: &Output) {
    if let SyncOutcome::Failed(message) = task.wait().await {
        output.warning(&format!(
            "Saved locally, but sync failed: {}",
            message
        ));
    }
}
