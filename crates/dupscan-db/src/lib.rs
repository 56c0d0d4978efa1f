//! # dupscan-db: Database Layer for DupScan
//!
//! This crate is the Store: persistent lists and the barcodes scanned into
//! them. It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DupScan Data Flow                                │
//! │                                                                         │
//! │  Scan session (duplicate resolver)        List screens                 │
//! │       │                                        │                        │
//! │       ▼                                        ▼                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     dupscan-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (list.rs,     │    │  (embedded)  │  │   │
//! │  │   │               │    │  barcode.rs)  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ListRepo      │    │ 001_initial  │  │   │
//! │  │   │ change feed   │    │ BarcodeRepo   │    │ _schema.sql  │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │           ▼                                                     │   │
//! │  │     LiveQuery (live.rs) ──► watch snapshots for the UI         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   barcode_lists ──1:N──► barcodes (ON DELETE CASCADE)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`live`] - Change feed and live queries
//! - [`repository`] - Repository implementations (list, barcode)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dupscan_db::{Database, DbConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let db = Database::new(DbConfig::new("path/to/dupscan.db")).await?;
//!
//! let list = db.lists().create("Inbound").await?;
//! let outcome = db
//!     .barcodes()
//!     .commit_if_absent(&list.id, "4006381333931", &CancellationToken::new())
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod live;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use live::{LiveQuery, StoreChange};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::barcode::BarcodeRepository;
pub use repository::list::ListRepository;
