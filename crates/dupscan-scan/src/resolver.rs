//! # Duplicate Resolver
//!
//! Decides whether a detected value is new to the session's list, and
//! commits it in the same atomic step when it is.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(list, value, cancel)                                          │
//! │                                                                         │
//! │  list = None                 ──► Failed(MissingListContext)            │
//! │  commit_if_absent:                                                      │
//! │    Inserted(id)              ──► Committed(id)                          │
//! │    AlreadyExists             ──► Duplicate                              │
//! │    Err(Cancelled)            ──► Cancelled     (nothing written)       │
//! │    Err(ForeignKeyViolation)  ──► Failed(MissingListContext)            │
//! │    Err(other)                ──► Failed(PersistenceFailure)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no retry: every failure ends the current scan cycle.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ScanResult;
use dupscan_core::{CommitOutcome, ScanFailure};
use dupscan_db::{Database, DbError};

/// Outcome of one resolver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A row was written; carries the new barcode id.
    Committed(String),
    /// The list already holds the value; nothing was written.
    Duplicate,
    /// The cycle failed.
    Failed(ScanFailure),
    /// The session was closed before the commit; nothing was written.
    Cancelled,
}

/// Checks candidates against the Store.
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    db: Database,
}

impl DuplicateResolver {
    pub fn new(db: Database) -> Self {
        DuplicateResolver { db }
    }

    /// Read-only check: does the list already hold `value`?
    ///
    /// Not used on the commit path, which must stay a single atomic step.
    pub async fn is_duplicate(&self, list_id: &str, value: &str) -> ScanResult<bool> {
        Ok(self.db.barcodes().exists(list_id, value).await?)
    }

    /// Commits `value` unless the list already holds it.
    pub async fn resolve(
        &self,
        list_id: Option<&str>,
        value: &str,
        cancel: &CancellationToken,
    ) -> Resolution {
        let Some(list_id) = list_id else {
            warn!(value = %value, "Detection without a list context");
            return Resolution::Failed(ScanFailure::MissingListContext);
        };

        match self
            .db
            .barcodes()
            .commit_if_absent(list_id, value, cancel)
            .await
        {
            Ok(CommitOutcome::Inserted(id)) => Resolution::Committed(id),
            Ok(CommitOutcome::AlreadyExists) => {
                debug!(list_id = %list_id, value = %value, "Duplicate detected");
                Resolution::Duplicate
            }
            Err(e) => failure(list_id, e),
        }
    }

    /// Inserts `value` even though the list already holds it.
    ///
    /// Never returns [`Resolution::Duplicate`].
    pub async fn force_add(
        &self,
        list_id: Option<&str>,
        value: &str,
        cancel: &CancellationToken,
    ) -> Resolution {
        let Some(list_id) = list_id else {
            return Resolution::Failed(ScanFailure::MissingListContext);
        };

        match self.db.barcodes().force_insert(list_id, value, cancel).await {
            Ok(id) => Resolution::Committed(id),
            Err(e) => failure(list_id, e),
        }
    }
}

fn failure(list_id: &str, err: DbError) -> Resolution {
    match err {
        DbError::Cancelled => {
            debug!(list_id = %list_id, "Commit cancelled with the session");
            Resolution::Cancelled
        }
        // The list was deleted out from under the session.
        DbError::ForeignKeyViolation { .. } => {
            warn!(list_id = %list_id, "Scan target list no longer exists");
            Resolution::Failed(ScanFailure::MissingListContext)
        }
        other => {
            warn!(list_id = %list_id, error = %other, "Commit failed");
            Resolution::Failed(ScanFailure::persistence(other))
        }
    }
}
