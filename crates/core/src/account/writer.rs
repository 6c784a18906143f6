//! Background credential persistence.

use std::sync::Arc;

use tokio::sync::watch;

use super::store::AccountStore;
use super::types::Account;

/// Handle for requesting saves.
///
/// Cheaply cloneable. Each request replaces any list the [`StoreWriter`] has
/// not picked up yet, so the newest list is always the one that ends up on
/// disk. Intermediate lists may be skipped.
#[derive(Clone)]
pub struct StoreHandle {
    tx: Arc<watch::Sender<Option<Vec<Account>>>>,
}

impl StoreHandle {
    pub fn new(tx: watch::Sender<Option<Vec<Account>>>) -> Self {
        Self { tx: Arc::new(tx) }
    }

    /// Request a save without blocking.
    ///
    /// Returns false if the writer is gone.
    pub fn try_save(&self, accounts: Vec<Account>) -> bool {
        self.tx.send_replace(Some(accounts));
        if self.tx.is_closed() {
            tracing::error!("Failed to queue account save: writer is gone");
            return false;
        }
        true
    }
}

/// Background task that writes the latest requested account list to the store.
pub struct StoreWriter {
    rx: watch::Receiver<Option<Vec<Account>>>,
    store: Arc<dyn AccountStore>,
}

impl StoreWriter {
    pub fn new(rx: watch::Receiver<Option<Vec<Account>>>, store: Arc<dyn AccountStore>) -> Self {
        Self { rx, store }
    }

    /// Run until every handle is dropped. A list requested before the last
    /// handle went away is still written.
    ///
    /// Spawn this as a background task. Store calls run on the blocking pool.
    pub async fn run(mut self) {
        tracing::info!("Account store writer started");

        while self.rx.changed().await.is_ok() {
            let Some(accounts) = self.rx.borrow_and_update().clone() else {
                continue;
            };
            let store = Arc::clone(&self.store);
            let count = accounts.len();
            let result = tokio::task::spawn_blocking(move || store.save(&accounts)).await;

            match result {
                Ok(Ok(())) => tracing::debug!("Saved {} accounts", count),
                Ok(Err(e)) => tracing::error!("Failed to save accounts: {}", e),
                Err(e) => tracing::error!("Account save task failed: {}", e),
            }
        }

        tracing::info!("Account store writer shutting down");
    }
}

/// Create a store handle and its writer.
///
/// Spawn the writer with `tokio::spawn(writer.run())`.
pub fn create_store_writer(store: Arc<dyn AccountStore>) -> (StoreHandle, StoreWriter) {
    let (tx, rx) = watch::channel(None);
    (StoreHandle::new(tx), StoreWriter::new(rx, store))
}
