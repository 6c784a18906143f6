//! Snapshot publication.

use tokio::sync::watch;

use super::types::AppState;

/// Write side of the published state. Owned by the orchestrator.
#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<AppState>,
}

impl StatusPublisher {
    pub fn new(initial: AppState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a snapshot. Subscribers are only woken when it differs from
    /// the previous one.
    ///
    /// Callers publish while holding the state lock, so snapshots are seen
    /// in commit order.
    pub fn publish(&self, state: AppState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        })
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Read-only handle for consumers.
    pub fn handle(&self) -> StatusHandle {
        StatusHandle {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of the published state.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<AppState>,
}

impl StatusHandle {
    /// Latest published snapshot. Never blocks on the orchestrator.
    pub fn snapshot(&self) -> AppState {
        self.rx.borrow().clone()
    }

    /// Receiver that is notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }

    /// Wait until a published snapshot satisfies `f`, including the current
    /// one. Returns `None` if the publisher is gone.
    pub async fn wait_for<F>(&self, f: F) -> Option<AppState>
    where
        F: FnMut(&AppState) -> bool,
    {
        let mut rx = self.rx.clone();
        let state = rx.wait_for(f).await.ok()?;
        Some(state.clone())
    }
}
