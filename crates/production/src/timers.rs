//! Tokio-backed timer scheduling.

use roundtable_core::{NodeInput, TimerId, TimerScheduler};
use roundtable_types::RoundKind;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Converts timer actions into tokio sleep tasks.
///
/// Setting a timer that is already pending replaces it; cancelling aborts
/// the pending task so the input never fires.
pub struct TimerManager<K> {
    input_tx: mpsc::Sender<NodeInput<K>>,
    handles: HashMap<TimerId, JoinHandle<()>>,
}

impl<K: RoundKind> TimerManager<K> {
    /// Create a manager that delivers `TimerFired` inputs on the channel.
    pub fn new(input_tx: mpsc::Sender<NodeInput<K>>) -> Self {
        Self {
            input_tx,
            handles: HashMap::new(),
        }
    }

    /// Abort every pending timer.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

impl<K: RoundKind> TimerScheduler for TimerManager<K> {
    fn set_timer(&mut self, id: TimerId, duration: Duration) {
        trace!(?id, ?duration, "Setting timer");

        if let Some(old) = self.handles.remove(&id) {
            old.abort();
        }

        let input_tx = self.input_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // The receiver is gone only when the runner stopped.
            let _ = input_tx.send(NodeInput::TimerFired { id }).await;
        });
        self.handles.insert(id, handle);
    }

    fn cancel_timer(&mut self, id: TimerId) {
        if let Some(handle) = self.handles.remove(&id) {
            trace!(?id, "Cancelling timer");
            handle.abort();
        }
    }
}

impl<K> Drop for TimerManager<K> {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}
