//! # dupscan-core: Pure Domain Logic for DupScan
//!
//! This crate holds the domain model and the scan lifecycle rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DupScan Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 dupscan-scan (pipeline)                         │   │
//! │  │   FrameSource ──► Decoder ──► Gate ──► Resolver ──► Session     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ dupscan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌────────────┐               │   │
//! │  │   │   types   │  │    scan     │  │ validation │               │   │
//! │  │   │  List     │  │  ScanState  │  │   names    │               │   │
//! │  │   │  Barcode  │  │  ScanEvent  │  │   values   │               │   │
//! │  │   └───────────┘  └─────────────┘  └────────────┘               │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO THREADS • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                dupscan-db (Store)                               │   │
//! │  │        SQLite queries, migrations, live queries                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (BarcodeList, Barcode, CommitOutcome)
//! - [`scan`] - Scan state machine (states, events, effects)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use dupscan_core::scan::{Effect, ScanEvent, ScanState};
//!
//! let t = ScanState::Idle
//!     .apply(ScanEvent::Committed("123".into()))
//!     .unwrap();
//! assert_eq!(t.state, ScanState::Success("123".into()));
//! assert_eq!(t.effect, Effect::StartDisplayTimer);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod scan;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use scan::{Effect, ScanEvent, ScanFailure, ScanState, Transition};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a list name, in characters.
pub const MAX_LIST_NAME_LEN: usize = 100;

/// Maximum length of a decoded barcode value, in bytes.
///
/// QR codes top out a little under 3 KB of byte-mode payload; anything larger
/// did not come from a real symbol.
pub const MAX_BARCODE_VALUE_LEN: usize = 4096;
