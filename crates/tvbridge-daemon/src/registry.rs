//! Registry of in-flight child processes
//!
//! Every process spawned by the runner is registered under a generated request
//! id together with a kill channel. The entry is removed when the process
//! completes or is terminated; `kill_all()` signals every remaining entry so
//! nothing outlives a shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::oneshot;

use tvbridge_core::prelude::*;

/// Global request ID counter
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A process awaiting completion
struct RegisteredProcess {
    /// Tells the owning run call to force-kill its child
    kill_tx: oneshot::Sender<()>,
    /// When the process was spawned
    started_at: Instant,
    /// Command line, for logging
    description: String,
}

/// Tracks spawned processes and kills them on demand
#[derive(Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<u64, RegisteredProcess>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, RegisteredProcess>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly spawned process.
    /// Returns (request_id, receiver that fires when a kill is requested)
    pub fn register(&self, description: &str) -> (u64, oneshot::Receiver<()>) {
        let id = next_request_id();
        let (kill_tx, kill_rx) = oneshot::channel();

        self.entries().insert(
            id,
            RegisteredProcess {
                kill_tx,
                started_at: Instant::now(),
                description: description.to_string(),
            },
        );

        trace!("Registered process #{}: {}", id, description);
        (id, kill_rx)
    }

    /// Remove a process that finished or was terminated.
    /// Returns true if the id was still registered.
    pub fn complete(&self, id: u64) -> bool {
        match self.entries().remove(&id) {
            Some(entry) => {
                trace!(
                    "Process #{} finished after {:?}: {}",
                    id,
                    entry.started_at.elapsed(),
                    entry.description
                );
                true
            }
            None => false,
        }
    }

    /// Signal every in-flight process to be killed. Returns how many were signalled.
    pub fn kill_all(&self) -> usize {
        let drained: Vec<(u64, RegisteredProcess)> = self.entries().drain().collect();
        let count = drained.len();

        for (id, entry) in drained {
            debug!("Killing process #{}: {}", id, entry.description);
            // The run call may have just finished on its own
            let _ = entry.kill_tx.send(());
        }

        if count > 0 {
            info!("Killed {} in-flight process(es)", count);
        }
        count
    }

    /// Number of processes currently registered
    pub fn in_flight(&self) -> usize {
        self.entries().len()
    }
}
