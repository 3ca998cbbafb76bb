//! Sync between the local store and the gist

mod reconciler;
mod status;

pub use reconciler::{Reconciler, SyncTask};
pub use status::{SyncOutcome, SyncStatus};
