//! Live queries.
//!
//! An explicit observer abstraction instead of framework magic: writes
//! publish a [`TableChange`] after commit, and a subscription re-runs its
//! query on every notification that touches its table. The change feed is
//! subscribed *before* the initial query runs, so a write landing in between
//! is picked up on the first receive — there is no missed-update window.

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::StoreError;
use crate::model::{DeviceCategory, HandoffItem, InboxFilter};

use super::Store;

/// Which logical table a committed write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChange {
    Items,
    Devices,
    Profile,
}

/// A registered live query over the items table. Dropping the subscription
/// (or calling [`ItemsSubscription::cancel`]) stops the refresh task.
pub struct ItemsSubscription {
    rx: watch::Receiver<Vec<HandoffItem>>,
    task: JoinHandle<()>,
}

impl Store {
    /// Register a live query: the result set re-evaluates whenever the items
    /// table changes.
    pub async fn watch_items(
        &self,
        filter: InboxFilter,
        device_category: Option<DeviceCategory>,
        device_id: Option<String>,
    ) -> Result<ItemsSubscription, StoreError> {
        let mut changes = self.changes();
        let initial = self
            .items_by_filter(filter, device_category, device_id.as_deref())
            .await?;
        let (tx, rx) = watch::channel(initial);

        let store = self.clone();
        let task = tokio::spawn(async move {
            loop {
                let refresh = match changes.recv().await {
                    Ok(TableChange::Items) => true,
                    // Missed notifications: re-query rather than risk staleness.
                    Err(broadcast::error::RecvError::Lagged(_)) => true,
                    Ok(_) => false,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if !refresh {
                    continue;
                }
                match store
                    .items_by_filter(filter, device_category, device_id.as_deref())
                    .await
                {
                    Ok(items) => {
                        if tx.send(items).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "live query refresh failed"),
                }
            }
        });

        Ok(ItemsSubscription { rx, task })
    }
}

impl ItemsSubscription {
    /// Latest result set.
    pub fn current(&self) -> Vec<HandoffItem> {
        self.rx.borrow().clone()
    }

    /// Wait for the next re-evaluation and return it. `None` once the
    /// subscription is cancelled.
    pub async fn changed(&mut self) -> Option<Vec<HandoffItem>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for ItemsSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
