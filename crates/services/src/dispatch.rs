use std::future::Future;

use storage::StorageError;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Best-effort, non-blocking hand-off of persistence work.
///
/// Work is spawned onto the ambient tokio runtime and never awaited by the
/// caller. Failures are logged at `warn` and otherwise dropped; they never
/// reach the state machine. Join handles are kept so that a caller may
/// loosely wait for outstanding work with [`Dispatcher::settle`].
#[derive(Debug, Default)]
pub struct Dispatcher {
    pending: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` without waiting for it.
    ///
    /// Outside a tokio runtime the work is dropped with a warning.
    pub fn dispatch<F>(&mut self, what: &'static str, work: F)
    where
        F: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        self.pending.retain(|handle| !handle.is_finished());

        let Ok(runtime) = Handle::try_current() else {
            warn!(what, "no async runtime available; dropping persistence work");
            return;
        };

        let handle = runtime.spawn(async move {
            match work.await {
                Ok(()) => debug!(what, "persisted"),
                Err(error) => warn!(what, %error, "best-effort persistence failed"),
            }
        });
        self.pending.push(handle);
    }

    /// Number of dispatched jobs that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait for every job dispatched so far.
    pub async fn settle(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(error) = handle.await {
                warn!(%error, "persistence task did not complete");
            }
        }
    }
}
