//! Local/remote reconciliation
//!
//! Keeps the local collection and the remote snapshot convergent with a
//! coarse policy: whichever side is non-empty wins, local breaks ties.
//!
//! - **Start-up pull** (`auto_pull`): an empty remote with a non-empty local
//!   collection is seeded from local; otherwise the remote replaces local,
//!   unless local changed while the pull was in flight, in which case local
//!   is pushed.
//! - **Mutations** (`update_bookmarks`): applied in memory and written to the
//!   local store before anything touches the network, then pushed in the
//!   background. A failed push never rolls local state back.
//!
//! Pushes are serialized and always send the newest in-memory snapshot, so
//! the remote ends up with the last local state even when mutations race.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::status::{SyncOutcome, SyncStatus};
use crate::models::{Bookmark, Settings};
use crate::remote::{RemoteStore, SyncError};
use crate::storage::LocalStore;

/// In-memory application state
struct State {
    bookmarks: Vec<Bookmark>,
    settings: Settings,
    /// Bumped on every change to `bookmarks`
    revision: u64,
    last_error: Option<String>,
}

/// Handle to a background sync attempt
///
/// Await it with [`SyncTask::wait`] or drop it to let the sync finish on its
/// own; dropping never cancels the work.
pub struct SyncTask {
    handle: Option<JoinHandle<SyncOutcome>>,
    owner: Option<Arc<Reconciler>>,
}

impl fmt::Debug for SyncTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTask")
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}

impl SyncTask {
    fn spawn<F>(owner: &Arc<Reconciler>, future: F) -> Self
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
            owner: Some(Arc::clone(owner)),
        }
    }

    /// A task for mutations made while sync is disabled
    pub fn skipped() -> Self {
        Self {
            handle: None,
            owner: None,
        }
    }

    /// Whether any remote work was scheduled
    pub fn is_scheduled(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait for the sync to finish
    ///
    /// A task that panicked or was aborted counts as a failed attempt.
    pub async fn wait(self) -> SyncOutcome {
        let Some(handle) = self.handle else {
            return SyncOutcome::Skipped;
        };

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("sync task aborted: {}", e);
                if let Some(owner) = &self.owner {
                    owner.record_failure(&message);
                }
                SyncOutcome::Failed(message)
            }
        }
    }
}

/// Owner of the bookmark collection and settings, and driver of sync
pub struct Reconciler {
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    state: Mutex<State>,
    bookmarks_tx: watch::Sender<Vec<Bookmark>>,
    status_tx: Arc<watch::Sender<SyncStatus>>,
    /// Serializes every remote round-trip
    remote_gate: tokio::sync::Mutex<()>,
    /// Highest revision known to match the remote
    pushed_revision: AtomicU64,
    /// Sync attempt counter, used to expire the success indicator
    attempts: Arc<AtomicU64>,
    display_interval: Duration,
}

impl Reconciler {
    /// Create a reconciler, loading state from the local store
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteStore>,
        display_interval: Duration,
    ) -> Arc<Self> {
        let (bookmarks, settings) = local.load();
        debug!("Loaded {} bookmarks from local store", bookmarks.len());

        let (bookmarks_tx, _) = watch::channel(bookmarks.clone());
        let (status_tx, _) = watch::channel(SyncStatus::Idle);

        Arc::new(Self {
            local,
            remote,
            state: Mutex::new(State {
                bookmarks,
                settings,
                revision: 0,
                last_error: None,
            }),
            bookmarks_tx,
            status_tx: Arc::new(status_tx),
            remote_gate: tokio::sync::Mutex::new(()),
            pushed_revision: AtomicU64::new(0),
            attempts: Arc::new(AtomicU64::new(0)),
            display_interval,
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Queries ====================

    /// Current bookmark collection
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.state().bookmarks.clone()
    }

    /// Current settings
    pub fn settings(&self) -> Settings {
        self.state().settings.clone()
    }

    /// Current sync status
    pub fn status(&self) -> SyncStatus {
        *self.status_tx.borrow()
    }

    /// Message of the last failed sync, cleared by the next attempt
    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// Local revision counter (incremented by every mutation)
    pub fn revision(&self) -> u64 {
        self.state().revision
    }

    /// Subscribe to collection changes
    pub fn subscribe_bookmarks(&self) -> watch::Receiver<Vec<Bookmark>> {
        self.bookmarks_tx.subscribe()
    }

    /// Subscribe to sync status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    // ==================== Mutations ====================

    /// Replace the whole collection, persist it, and push if sync is on
    pub fn update_bookmarks(self: &Arc<Self>, bookmarks: Vec<Bookmark>) -> SyncTask {
        let ((), task) = self.modify_bookmarks(|current| *current = bookmarks);
        task
    }

    /// Edit the collection in place under the state lock
    ///
    /// The edit and the local write happen before this returns; the push is
    /// left running in the background.
    pub fn modify_bookmarks<R>(
        self: &Arc<Self>,
        edit: impl FnOnce(&mut Vec<Bookmark>) -> R,
    ) -> (R, SyncTask) {
        let (result, sync_enabled) = {
            let mut state = self.state();
            let result = edit(&mut state.bookmarks);
            self.commit_locked(&mut state);
            (result, state.settings.sync_enabled())
        };

        if !sync_enabled {
            return (result, SyncTask::skipped());
        }

        let this = Arc::clone(self);
        (result, SyncTask::spawn(self, async move { this.push_latest().await }))
    }

    /// Replace settings; a configured sync triggers a fresh pull
    pub fn save_settings(self: &Arc<Self>, settings: Settings) -> SyncTask {
        {
            let mut state = self.state();
            if let Err(e) = self.local.save_settings(&settings) {
                warn!("Failed to persist settings: {}", e);
            }
            state.settings = settings.clone();
        }

        if settings.sync_enabled() {
            self.spawn_auto_pull()
        } else {
            SyncTask::skipped()
        }
    }

    /// Run [`Reconciler::auto_pull`] in the background
    pub fn spawn_auto_pull(self: &Arc<Self>) -> SyncTask {
        let this = Arc::clone(self);
        SyncTask::spawn(self, async move { this.auto_pull().await })
    }

    // ==================== Sync ====================

    /// Start-up reconciliation
    ///
    /// Does nothing unless both credentials are set. Failures leave the
    /// status at `Error` and local state untouched.
    pub async fn auto_pull(&self) -> SyncOutcome {
        let settings = self.settings();
        if !settings.sync_enabled() {
            return SyncOutcome::Skipped;
        }

        let attempt = self.begin_attempt();
        let result = self.pull_and_reconcile(&settings).await;
        self.finish_attempt(attempt, result)
    }

    /// Push the newest local snapshot
    pub async fn push_latest(&self) -> SyncOutcome {
        let settings = self.settings();
        if !settings.sync_enabled() {
            return SyncOutcome::Skipped;
        }

        let attempt = self.begin_attempt();
        let result = self.push_snapshot(&settings).await;
        self.finish_attempt(attempt, result)
    }

    async fn pull_and_reconcile(&self, settings: &Settings) -> Result<SyncOutcome, SyncError> {
        let _gate = self.remote_gate.lock().await;
        let revision_before = self.revision();

        let remote = self.remote.pull(settings).await?;

        // Decide and apply under one lock
        let mut pulled = 0;
        let upload = {
            let mut state = self.state();
            if state.revision != revision_before {
                // Local changed mid-pull and is newer than the fetched snapshot
                info!(
                    "Local collection changed during pull (revision {} -> {}), pushing local",
                    revision_before, state.revision
                );
                Some((state.bookmarks.clone(), state.revision))
            } else if remote.is_empty() && !state.bookmarks.is_empty() {
                info!(
                    "Remote is empty, seeding it with {} local bookmarks",
                    state.bookmarks.len()
                );
                Some((state.bookmarks.clone(), state.revision))
            } else {
                pulled = remote.len();
                state.bookmarks = remote;
                self.commit_locked(&mut state);
                self.mark_pushed(state.revision);
                None
            }
        };

        let Some((local, revision)) = upload else {
            return Ok(SyncOutcome::Pulled { count: pulled });
        };

        self.remote.push(&local, settings).await?;
        self.mark_pushed(revision);
        Ok(SyncOutcome::Pushed { count: local.len() })
    }

    async fn push_snapshot(&self, settings: &Settings) -> Result<SyncOutcome, SyncError> {
        let _gate = self.remote_gate.lock().await;

        let (bookmarks, revision) = {
            let state = self.state();
            (state.bookmarks.clone(), state.revision)
        };
        if revision <= self.pushed_revision.load(Ordering::SeqCst) {
            debug!("Revision {} already on remote, skipping push", revision);
            return Ok(SyncOutcome::Superseded);
        }

        self.remote.push(&bookmarks, settings).await?;
        self.mark_pushed(revision);
        Ok(SyncOutcome::Pushed {
            count: bookmarks.len(),
        })
    }

    /// Persist and publish the collection after an edit (state lock held)
    fn commit_locked(&self, state: &mut State) {
        state.revision += 1;
        if let Err(e) = self.local.save_bookmarks(&state.bookmarks) {
            warn!("Failed to persist bookmarks: {}", e);
        }
        self.bookmarks_tx.send_replace(state.bookmarks.clone());
    }

    fn mark_pushed(&self, revision: u64) {
        self.pushed_revision.fetch_max(revision, Ordering::SeqCst);
    }

    fn begin_attempt(&self) -> u64 {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.state().last_error = None;
        self.set_status(SyncStatus::Syncing);
        attempt
    }

    fn finish_attempt(&self, attempt: u64, result: Result<SyncOutcome, SyncError>) -> SyncOutcome {
        match result {
            Ok(outcome) => {
                debug!("Sync attempt {} finished: {:?}", attempt, outcome);
                self.set_status(SyncStatus::Success);
                self.schedule_idle(attempt);
                outcome
            }
            Err(e) => {
                warn!("Sync attempt {} failed: {}", attempt, e);
                let message = e.to_string();
                self.record_failure(&message);
                SyncOutcome::Failed(message)
            }
        }
    }

    fn record_failure(&self, message: &str) {
        self.state().last_error = Some(message.to_string());
        self.set_status(SyncStatus::Error);
    }

    /// Drop the success indicator back to idle unless a newer attempt started
    fn schedule_idle(&self, attempt: u64) {
        let status_tx = Arc::clone(&self.status_tx);
        let attempts = Arc::clone(&self.attempts);
        let delay = self.display_interval;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if attempts.load(Ordering::SeqCst) != attempt {
                return;
            }
            status_tx.send_if_modified(|status| {
                if *status == SyncStatus::Success {
                    *status = SyncStatus::Idle;
                    true
                } else {
                    false
                }
            });
        });
    }

    fn set_status(&self, status: SyncStatus) {
        debug!("Sync status: {}", status);
        self.status_tx.send_replace(status);
    }
}
