//! # Barcode Repository
//!
//! Storage for scanned barcode values, including the atomic
//! check-and-insert used by the scanning pipeline.
//!
//! ## Commit If Absent
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 commit_if_absent(list_id, value, cancel)                │
//! │                                                                         │
//! │  cancelled? ──yes──► Err(Cancelled)          (nothing written)         │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  INSERT INTO barcodes (...)                                            │
//! │    SELECT ?, ?, ?, ?                                                    │
//! │    WHERE NOT EXISTS (same list_id AND value)  ← one statement, so no   │
//! │       │                                         writer can interleave  │
//! │       ▼                                         between check and add  │
//! │  cancelled? ──yes──► ROLLBACK, Err(Cancelled)                          │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  COMMIT  ← linearization point                                         │
//! │       │                                                                 │
//! │       ├── 1 row  ──► Inserted(id)                                       │
//! │       └── 0 rows ──► AlreadyExists                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Duplicates are only ever prevented here, never by a schema constraint:
//! `force_insert` must be able to store the same value twice.

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::live::{publish, LiveQuery, StoreChange};
use dupscan_core::validation::validate_barcode_value;
use dupscan_core::{Barcode, CommitOutcome};

/// Repository for barcode database operations.
#[derive(Debug, Clone)]
pub struct BarcodeRepository {
    pool: SqlitePool,
    changes: broadcast::Sender<StoreChange>,
}

impl BarcodeRepository {
    /// Creates a new BarcodeRepository.
    pub fn new(pool: SqlitePool, changes: broadcast::Sender<StoreChange>) -> Self {
        BarcodeRepository { pool, changes }
    }

    /// Returns the barcodes of a list in scan order.
    pub async fn list_for_list(&self, list_id: &str) -> DbResult<Vec<Barcode>> {
        fetch_for_list(&self.pool, list_id).await
    }

    /// Returns a live view of one list's barcodes.
    ///
    /// Writes to other lists do not trigger a refresh.
    pub async fn live_for_list(&self, list_id: &str) -> DbResult<LiveQuery<Vec<Barcode>>> {
        let pool = self.pool.clone();
        let watched = list_id.to_string();
        let fetch_id = list_id.to_string();

        LiveQuery::spawn(
            &self.changes,
            move |change| change.touches_list(&watched),
            move || {
                let pool = pool.clone();
                let list_id = fetch_id.clone();
                async move { fetch_for_list(&pool, &list_id).await }
            },
        )
        .await
    }

    /// Returns true if `value` is already stored in the list.
    pub async fn exists(&self, list_id: &str, value: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM barcodes WHERE list_id = ?1 AND value = ?2
            )
            "#,
        )
        .bind(list_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Counts the barcodes in a list.
    pub async fn count_for_list(&self, list_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM barcodes WHERE list_id = ?1")
            .bind(list_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts `value` into the list unless it is already there.
    ///
    /// The existence check and the insert are one statement inside one
    /// transaction, so concurrent callers committing the same value to the
    /// same list produce exactly one row.
    ///
    /// ## Returns
    /// * `Ok(CommitOutcome::Inserted(id))` - A new row was committed
    /// * `Ok(CommitOutcome::AlreadyExists)` - Nothing written
    /// * `Err(DbError::Cancelled)` - Token fired before COMMIT; nothing written
    /// * `Err(DbError::ForeignKeyViolation)` - The list does not exist
    pub async fn commit_if_absent(
        &self,
        list_id: &str,
        value: &str,
        cancel: &CancellationToken,
    ) -> DbResult<CommitOutcome> {
        validate_barcode_value(value)?;

        let id = Uuid::new_v4().to_string();
        let inserted = self
            .insert_in_tx(
                r#"
                INSERT INTO barcodes (id, list_id, value, scanned_at)
                SELECT ?1, ?2, ?3, ?4
                WHERE NOT EXISTS (
                    SELECT 1 FROM barcodes WHERE list_id = ?2 AND value = ?3
                )
                "#,
                &id,
                list_id,
                value,
                cancel,
            )
            .await?;

        if inserted {
            debug!(list_id = %list_id, id = %id, "Committed new barcode");
            Ok(CommitOutcome::Inserted(id))
        } else {
            debug!(list_id = %list_id, "Barcode already present");
            Ok(CommitOutcome::AlreadyExists)
        }
    }

    /// Inserts `value` unconditionally, even if the list already holds it.
    ///
    /// Returns the new row id.
    pub async fn force_insert(
        &self,
        list_id: &str,
        value: &str,
        cancel: &CancellationToken,
    ) -> DbResult<String> {
        validate_barcode_value(value)?;

        let id = Uuid::new_v4().to_string();
        self.insert_in_tx(
            r#"
            INSERT INTO barcodes (id, list_id, value, scanned_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            &id,
            list_id,
            value,
            cancel,
        )
        .await?;

        debug!(list_id = %list_id, id = %id, "Force-inserted barcode");
        Ok(id)
    }

    /// Runs one insert statement in a transaction that commits only if
    /// `cancel` has not fired. Returns whether a row was written.
    async fn insert_in_tx(
        &self,
        sql: &str,
        id: &str,
        list_id: &str,
        value: &str,
        cancel: &CancellationToken,
    ) -> DbResult<bool> {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| match e {
                sqlx::Error::PoolClosed => DbError::ConnectionFailed(e.to_string()),
                other => DbError::TransactionFailed(other.to_string()),
            })?;

        let rows = sqlx::query(sql)
            .bind(id)
            .bind(list_id)
            .bind(value)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if cancel.is_cancelled() {
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            debug!(list_id = %list_id, "Commit cancelled, rolled back");
            return Err(DbError::Cancelled);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if rows > 0 {
            publish(
                &self.changes,
                StoreChange::BarcodesChanged {
                    list_id: list_id.to_string(),
                },
            );
        }

        Ok(rows > 0)
    }
}

async fn fetch_for_list(pool: &SqlitePool, list_id: &str) -> DbResult<Vec<Barcode>> {
    let barcodes = sqlx::query_as::<_, Barcode>(
        r#"
        SELECT id, list_id, value, scanned_at
        FROM barcodes
        WHERE list_id = ?1
        ORDER BY scanned_at, rowid
        "#,
    )
    .bind(list_id)
    .fetch_all(pool)
    .await?;

    Ok(barcodes)
}

// =============================================================================
// Unit Tests
// =============================================================================
