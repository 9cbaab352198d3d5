//! Real-time tick delivery for session countdowns.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use prep_core::timer::{TimerHandle, TimerKind};

use crate::sessions::SessionEvent;

/// Receives arm/disarm notifications for countdowns started by the controller.
pub trait TickSink: Send + Sync {
    /// Start delivering one tick per second for `handle`.
    fn arm(&self, handle: TimerHandle);
    /// Stop delivering ticks for `handle`. Unknown or replaced handles are ignored.
    fn disarm(&self, handle: TimerHandle);
}

/// Sends `SessionEvent::Tick` into the controller's event channel once per
/// second for each armed countdown, using one tokio task per countdown.
pub struct TokioTicker {
    tx: UnboundedSender<SessionEvent>,
    period: Duration,
    tasks: Mutex<HashMap<TimerKind, (TimerHandle, JoinHandle<()>)>>,
}

impl TokioTicker {
    #[must_use]
    pub fn new(tx: UnboundedSender<SessionEvent>) -> Self {
        Self::with_period(tx, Duration::from_secs(1))
    }

    /// Custom tick period, mainly for tests and demos.
    #[must_use]
    pub fn with_period(tx: UnboundedSender<SessionEvent>, period: Duration) -> Self {
        Self {
            tx,
            period,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of countdowns currently producing ticks.
    #[must_use]
    pub fn armed(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.values().filter(|(_, task)| !task.is_finished()).count())
            .unwrap_or(0)
    }
}

impl TickSink for TokioTicker {
    fn arm(&self, handle: TimerHandle) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(kind = %handle.kind(), "no async runtime available; countdown will not tick");
            return;
        };

        let tx = self.tx.clone();
        let period = self.period;
        let task = runtime.spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if tx.send(SessionEvent::Tick(handle)).is_err() {
                    break;
                }
            }
        });

        let Ok(mut tasks) = self.tasks.lock() else {
            task.abort();
            warn!("ticker registry poisoned");
            return;
        };
        if let Some((_, previous)) = tasks.insert(handle.kind(), (handle, task)) {
            previous.abort();
        }
        debug!(kind = %handle.kind(), generation = handle.generation(), "countdown armed");
    }

    fn disarm(&self, handle: TimerHandle) {
        let Ok(mut tasks) = self.tasks.lock() else {
            return;
        };
        if tasks.get(&handle.kind()).is_some_and(|(armed, _)| *armed == handle) {
            if let Some((_, task)) = tasks.remove(&handle.kind()) {
                task.abort();
                debug!(kind = %handle.kind(), generation = handle.generation(), "countdown disarmed");
            }
        }
    }
}

impl Drop for TokioTicker {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for (_, (_, task)) in tasks.drain() {
                task.abort();
            }
        }
    }
}
