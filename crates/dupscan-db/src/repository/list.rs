//! # List Repository
//!
//! Database operations for barcode lists.
//!
//! ## Cascade Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    delete(list_id)                                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. DELETE FROM barcodes      WHERE list_id = ?                 │   │
//! │  │  2. DELETE FROM barcode_lists WHERE id = ?                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← no orphaned barcode can survive its list                     │
//! │                                                                         │
//! │  The schema also declares ON DELETE CASCADE; the explicit delete keeps │
//! │  the guarantee even on connections opened without foreign_keys=ON.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::live::{publish, LiveQuery, StoreChange};
use dupscan_core::validation::{normalize_list_name, validate_list_name};
use dupscan_core::BarcodeList;

/// Repository for list database operations.
#[derive(Debug, Clone)]
pub struct ListRepository {
    pool: SqlitePool,
    changes: broadcast::Sender<StoreChange>,
}

impl ListRepository {
    /// Creates a new ListRepository.
    pub fn new(pool: SqlitePool, changes: broadcast::Sender<StoreChange>) -> Self {
        ListRepository { pool, changes }
    }

    /// Returns every list, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<BarcodeList>> {
        fetch_all(&self.pool).await
    }

    /// Returns a live view of every list, ordered by name.
    ///
    /// The view refreshes whenever a list is created or deleted.
    pub async fn live_all(&self) -> DbResult<LiveQuery<Vec<BarcodeList>>> {
        let pool = self.pool.clone();
        LiveQuery::spawn(
            &self.changes,
            |change| matches!(change, StoreChange::ListsChanged),
            move || {
                let pool = pool.clone();
                async move { fetch_all(&pool).await }
            },
        )
        .await
    }

    /// Gets a list by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(BarcodeList))` - List found
    /// * `Ok(None)` - List not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<BarcodeList>> {
        let list = sqlx::query_as::<_, BarcodeList>(
            r#"
            SELECT id, name, created_at
            FROM barcode_lists
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(list)
    }

    /// Creates a new list.
    ///
    /// ## Arguments
    /// * `name` - Display name; surrounding whitespace is trimmed
    ///
    /// ## Returns
    /// * `Ok(BarcodeList)` - The stored list with its generated id
    /// * `Err(DbError::Validation)` - Empty or malformed name
    pub async fn create(&self, name: &str) -> DbResult<BarcodeList> {
        validate_list_name(name)?;

        let list = BarcodeList {
            id: Uuid::new_v4().to_string(),
            name: normalize_list_name(name),
            created_at: Utc::now(),
        };

        debug!(id = %list.id, name = %list.name, "Creating list");

        sqlx::query(
            r#"
            INSERT INTO barcode_lists (id, name, created_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&list.id)
        .bind(&list.name)
        .bind(list.created_at)
        .execute(&self.pool)
        .await?;

        publish(&self.changes, StoreChange::ListsChanged);
        Ok(list)
    }

    /// Deletes a list and every barcode in it.
    ///
    /// ## Returns
    /// * `Ok(u64)` - Number of barcodes removed with the list
    /// * `Err(DbError::NotFound)` - No such list; nothing was changed
    pub async fn delete(&self, id: &str) -> DbResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let barcodes = sqlx::query("DELETE FROM barcodes WHERE list_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let lists = sqlx::query("DELETE FROM barcode_lists WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if lists == 0 {
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            return Err(DbError::not_found("List", id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %id, barcodes, "Deleted list");

        publish(&self.changes, StoreChange::ListsChanged);
        publish(
            &self.changes,
            StoreChange::BarcodesChanged {
                list_id: id.to_string(),
            },
        );
        Ok(barcodes)
    }

    /// Counts lists (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM barcode_lists")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn fetch_all(pool: &SqlitePool) -> DbResult<Vec<BarcodeList>> {
    let lists = sqlx::query_as::<_, BarcodeList>(
        r#"
        SELECT id, name, created_at
        FROM barcode_lists
        ORDER BY name COLLATE NOCASE, created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(lists)
}

// =============================================================================
// Unit Tests
// =============================================================================
