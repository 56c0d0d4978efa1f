//! # Scan Gate
//!
//! A two-state flag shared by the frame worker and the session task.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Gate Ownership                                 │
//! │                                                                         │
//! │            try_pause()                       reopen()                  │
//! │   OPEN ──────────────────────► PAUSED ──────────────────────► OPEN    │
//! │        GateTrigger                     GateReleaser                    │
//! │        (frame worker only)             (session task only)             │
//! │                                                                         │
//! │  try_pause is a compare-and-swap: of any number of racing detections, │
//! │  exactly one wins and is forwarded; the rest are discarded.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const OPEN: bool = true;
const PAUSED: bool = false;

/// Read-only view of the gate, plus the factory for its two writers.
#[derive(Debug, Clone)]
pub struct ScanGate {
    open: Arc<AtomicBool>,
}

impl Default for ScanGate {
    fn default() -> Self {
        ScanGate {
            open: Arc::new(AtomicBool::new(OPEN)),
        }
    }
}

impl ScanGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Handle for the frame worker.
    pub fn trigger(&self) -> GateTrigger {
        GateTrigger {
            open: self.open.clone(),
        }
    }

    /// Handle for the state machine driver.
    pub fn releaser(&self) -> GateReleaser {
        GateReleaser {
            open: self.open.clone(),
        }
    }
}

/// The `Open → Paused` writer.
#[derive(Debug)]
pub struct GateTrigger {
    open: Arc<AtomicBool>,
}

impl GateTrigger {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Pauses the gate if it is open. Returns true if this call paused it.
    pub fn try_pause(&self) -> bool {
        self.open
            .compare_exchange(OPEN, PAUSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// The `Paused → Open` writer.
#[derive(Debug)]
pub struct GateReleaser {
    open: Arc<AtomicBool>,
}

impl GateReleaser {
    /// Reopens the gate. Returns true if it was paused.
    pub fn reopen(&self) -> bool {
        self.open
            .compare_exchange(PAUSED, OPEN, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
