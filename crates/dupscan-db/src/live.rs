//! # Live Queries
//!
//! Push-based read views over the store.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Live Query Refresh                               │
//! │                                                                         │
//! │  Writer (create/delete list, commit barcode)                           │
//! │       │                                                                 │
//! │       │  StoreChange::BarcodesChanged { list_id }                      │
//! │       ▼                                                                 │
//! │  broadcast channel ──────────────┬──────────────────┐                  │
//! │                                  ▼                  ▼                   │
//! │                        refresh task (lists)  refresh task (list L)     │
//! │                          re-query on            re-query only if        │
//! │                          ListsChanged           change touches L        │
//! │                                  │                  │                   │
//! │                                  ▼                  ▼                   │
//! │                         watch (latest value)  watch (latest value)     │
//! │                                  │                  │                   │
//! │                                  ▼                  ▼                   │
//! │                             LiveQuery          LiveQuery               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers only ever see whole snapshots. Dropping the last receiver stops
//! the refresh task.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::error::DbResult;

// =============================================================================
// Change Notifications
// =============================================================================

/// A write that may invalidate live queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A list was created or deleted.
    ListsChanged,
    /// Barcodes of one list were added or removed.
    BarcodesChanged { list_id: String },
}

impl StoreChange {
    /// Returns true if this change touches the barcodes of `list_id`.
    pub fn touches_list(&self, list_id: &str) -> bool {
        match self {
            StoreChange::ListsChanged => false,
            StoreChange::BarcodesChanged { list_id: changed } => changed == list_id,
        }
    }
}

/// Publishes a change, ignoring the case where nobody is listening.
pub(crate) fn publish(changes: &broadcast::Sender<StoreChange>, change: StoreChange) {
    debug!(?change, "Publishing store change");
    let _ = changes.send(change);
}

// =============================================================================
// Live Query
// =============================================================================

/// A continuously refreshed query result.
///
/// ## Usage
/// ```rust,ignore
/// let mut lists = db.lists().live_all().await?;
/// println!("{} lists", lists.current().len());
///
/// while let Some(snapshot) = lists.changed().await {
///     println!("now {} lists", snapshot.len());
/// }
/// ```
#[derive(Debug)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
}

impl<T> LiveQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs `fetch` once, then spawns a task that re-runs it whenever a
    /// change accepted by `relevant` is published.
    ///
    /// The change subscription is taken before the first fetch so no write
    /// can slip between the snapshot and the subscription.
    pub(crate) async fn spawn<F, Fut, R>(
        changes: &broadcast::Sender<StoreChange>,
        relevant: R,
        fetch: F,
    ) -> DbResult<Self>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = DbResult<T>> + Send + 'static,
        R: Fn(&StoreChange) -> bool + Send + 'static,
    {
        let mut change_rx = changes.subscribe();
        let initial = fetch().await?;
        let (tx, rx) = watch::channel(initial);

        tokio::spawn(async move {
            loop {
                let refresh = tokio::select! {
                    _ = tx.closed() => false,
                    change = change_rx.recv() => match change {
                        Ok(change) => {
                            if !relevant(&change) {
                                continue;
                            }
                            true
                        }
                        // Missed some notifications; a re-query covers all of them.
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Live query lagged, refreshing");
                            true
                        }
                        Err(RecvError::Closed) => false,
                    },
                };

                if !refresh {
                    break;
                }

                match fetch().await {
                    Ok(value) => {
                        tx.send_replace(value);
                    }
                    Err(e) => warn!(?e, "Live query refresh failed, keeping last snapshot"),
                }
            }

            debug!("Live query stopped");
        });

        Ok(LiveQuery { rx })
    }

    /// Returns the latest snapshot.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the store has shut down.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Returns another receiver of the same snapshots.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }

    /// Converts into a `Stream` that yields the current snapshot first,
    /// then every refresh.
    pub fn into_stream(self) -> WatchStream<T> {
        WatchStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_list() {
        let change = StoreChange::BarcodesChanged {
            list_id: "a".into(),
        };
        assert!(change.touches_list("a"));
        assert!(!change.touches_list("b"));
        assert!(!StoreChange::ListsChanged.touches_list("a"));
    }

    #[tokio::test]
    async fn test_refreshes_on_relevant_change() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let (changes, _) = broadcast::channel(8);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let mut live = LiveQuery::spawn(
            &changes,
            |c| matches!(c, StoreChange::ListsChanged),
            move || {
                let counter = counter.clone();
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
            },
        )
        .await
        .unwrap();

        assert_eq!(live.current(), 1);

        // Irrelevant change is skipped, relevant one refreshes.
        publish(
            &changes,
            StoreChange::BarcodesChanged {
                list_id: "x".into(),
            },
        );
        publish(&changes, StoreChange::ListsChanged);

        assert_eq!(live.changed().await, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
