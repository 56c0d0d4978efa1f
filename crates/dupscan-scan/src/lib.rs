//! # dupscan-scan: Scan-Intake Pipeline for DupScan
//!
//! Turns a stream of camera frames into barcodes persisted in a list, or
//! into a duplicate / error decision for the user.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Scan Pipeline                                  │
//! │                                                                         │
//! │  Frame Source ──► Decoder ──► Scan Gate ──► Duplicate Resolver         │
//! │  (frame.rs)      (decoder.rs)  (gate.rs)     (resolver.rs)             │
//! │   keep-latest     opaque,       Open→Paused   commit_if_absent         │
//! │   slot            errors        by worker     under session token      │
//! │                   swallowed         ▲              │                    │
//! │                                     │              ▼                    │
//! │                                     │       Scan State Machine         │
//! │                                     │       (session.rs driver over    │
//! │                                     └────── dupscan_core::ScanState)   │
//! │                                  Paused→Open                           │
//! │                                  by driver only                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threads and Tasks
//!
//! - One `std` thread per session runs acquisition and decode
//!   ([`worker`]). It never touches the database.
//! - One tokio task per session drives the state machine
//!   ([`session`]); commits run there under a cancellation token.
//!
//! ## Module Organization
//!
//! - [`config`] - Scanner configuration (database, scan timing, logging)
//! - [`decoder`] - Decoder trait and the error-swallowing boundary
//! - [`error`] - Scan error types
//! - [`frame`] - Frames, release guard, keep-latest slot, counters
//! - [`gate`] - Atomic scan gate with split writers
//! - [`logging`] - Tracing bootstrap
//! - [`resolver`] - Duplicate resolver over the Store
//! - [`session`] - Scan session handle and driver
//! - [`worker`] - Frame worker thread

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod gate;
pub mod logging;
pub mod resolver;
pub mod session;
pub mod worker;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, LoggingSettings, ScanSettings, ScannerConfig};
pub use decoder::{decode_frame, first_value, Decoder, PayloadDecoder};
pub use error::{DecodeError, ScanError, ScanResult};
pub use frame::{Frame, FrameSink, FrameStatsSnapshot, Rotation};
pub use gate::ScanGate;
pub use logging::init_tracing;
pub use resolver::{DuplicateResolver, Resolution};
pub use session::ScanSession;
