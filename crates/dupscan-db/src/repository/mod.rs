//! # Repository Module
//!
//! Database repository implementations for DupScan.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Scan session / UI                                                     │
//! │       │                                                                 │
//! │       │  db.barcodes().commit_if_absent(list_id, "123", &cancel)       │
//! │       ▼                                                                 │
//! │  BarcodeRepository                                                     │
//! │  ├── commit_if_absent(&self, list_id, value, cancel)                   │
//! │  ├── force_insert(&self, list_id, value, cancel)                       │
//! │  ├── exists(&self, list_id, value)                                     │
//! │  └── live_for_list(&self, list_id)                                     │
//! │       │                                                                 │
//! │       │  SQL + change notification                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ListRepository`](list::ListRepository) - List CRUD, cascading delete
//! - [`BarcodeRepository`](barcode::BarcodeRepository) - Atomic commits and lookups

pub mod barcode;
pub mod list;
