//! # Domain Types
//!
//! Persisted entities and store outcomes.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐  1     *  ┌─────────────────┐                      │
//! │  │  BarcodeList    │◄──────────│    Barcode      │                      │
//! │  │  ─────────────  │  cascade  │  ─────────────  │                      │
//! │  │  id (UUID)      │  delete   │  id (UUID)      │                      │
//! │  │  name           │           │  list_id (FK)   │                      │
//! │  └─────────────────┘           │  value          │                      │
//! │                                │  scanned_at     │                      │
//! │                                └─────────────────┘                      │
//! │                                                                         │
//! │  ┌─────────────────────────┐                                           │
//! │  │     CommitOutcome       │  result of the store's atomic             │
//! │  │  Inserted(id)           │  check-and-insert                         │
//! │  │  AlreadyExists          │                                           │
//! │  └─────────────────────────┘                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Barcodes are immutable once written. The only way one disappears is the
//! cascade when its list is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Barcode List
// =============================================================================

/// A named collection of scanned values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BarcodeList {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name chosen by the user.
    pub name: String,

    /// When the list was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Barcode
// =============================================================================

/// One persisted scanned value, attributed to a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Barcode {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// The list this barcode belongs to.
    pub list_id: String,

    /// Raw decoded value.
    pub value: String,

    /// Capture time.
    #[ts(as = "String")]
    pub scanned_at: DateTime<Utc>,
}

// =============================================================================
// Commit Outcome
// =============================================================================

/// Result of an atomic check-and-insert.
///
/// `AlreadyExists` is not a failure: it is the duplicate branch that needs
/// a user decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A new row was written; carries its id.
    Inserted(String),
    /// The list already holds this value; nothing was written.
    AlreadyExists,
}

impl CommitOutcome {
    /// Returns true if a row was written.
    pub fn is_inserted(&self) -> bool {
        matches!(self, CommitOutcome::Inserted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_outcome() {
        assert!(CommitOutcome::Inserted("abc".into()).is_inserted());
        assert!(!CommitOutcome::AlreadyExists.is_inserted());
    }

    #[test]
    fn test_barcode_serializes_camel_case() {
        let barcode = Barcode {
            id: "b-1".into(),
            list_id: "l-1".into(),
            value: "4006381333931".into(),
            scanned_at: Utc::now(),
        };
        let json = serde_json::to_value(&barcode).unwrap();
        assert_eq!(json["listId"], "l-1");
        assert!(json.get("scannedAt").is_some());
    }
}
