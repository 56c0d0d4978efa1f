//! # Frame Source
//!
//! Camera frames and the keep-only-latest hand-off to the frame worker.
//!
//! ## Backpressure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Keep-Only-Latest Slot                                │
//! │                                                                         │
//! │  camera thread                                 frame worker            │
//! │  ─────────────                                 ────────────            │
//! │  offer(F1) ──► [ F1 ]                                                  │
//! │                [    ] ──────────────────────►  next_frame() = F1       │
//! │  offer(F2) ──► [ F2 ]                          decoding F1 ...         │
//! │  offer(F3) ──► [ F3 ]  F2 released (dropped)   decoding F1 ...         │
//! │                [    ] ──────────────────────►  next_frame() = F3       │
//! │                                                                         │
//! │  At most one frame waits; a newer frame evicts it. Nothing queues.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Release Guarantee
//! A [`Frame`] runs its release callback exactly once: when it is released
//! explicitly, evicted from the slot, discarded on close, or simply
//! dropped on a panic path.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::trace;

// =============================================================================
// Rotation
// =============================================================================

/// Clockwise rotation needed to display the frame upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parses a rotation in degrees. Only right angles are valid.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

// =============================================================================
// Frame
// =============================================================================

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// One camera image.
///
/// ## Example
/// ```rust,ignore
/// let frame = Frame::new(buffer, 1280, 720, Rotation::Deg90)
///     .on_release(move || camera.return_buffer(slot));
/// sink.offer(frame);
/// ```
pub struct Frame {
    pixels: Option<Vec<u8>>,
    width: u32,
    height: u32,
    rotation: Rotation,
    release: Option<ReleaseFn>,
}

impl Frame {
    /// Creates a frame with image data.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, rotation: Rotation) -> Self {
        Frame {
            pixels: Some(pixels),
            width,
            height,
            rotation,
            release: None,
        }
    }

    /// Creates a frame whose image data is unavailable. It is released
    /// without being decoded.
    pub fn without_image(width: u32, height: u32, rotation: Rotation) -> Self {
        Frame {
            pixels: None,
            width,
            height,
            rotation,
            release: None,
        }
    }

    /// Sets the callback that hands the underlying buffer back to the camera.
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Pixel data, if the camera delivered any.
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Returns the frame to its producer.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("bytes", &self.pixels.as_ref().map(Vec::len))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rotation", &self.rotation)
            .finish()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Frame pipeline counters.
#[derive(Debug, Default)]
pub struct FrameStats {
    offered: AtomicU64,
    dropped: AtomicU64,
    decoded: AtomicU64,
    detected: AtomicU64,
}

/// Point-in-time copy of [`FrameStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStatsSnapshot {
    /// Frames handed to the sink.
    pub offered: u64,
    /// Frames evicted or discarded before reaching the decoder.
    pub dropped: u64,
    /// Frames run through the decoder.
    pub decoded: u64,
    /// Decodes that produced a value.
    pub detected: u64,
}

impl FrameStats {
    pub(crate) fn record_decoded(&self, detected: bool) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
        if detected {
            self.detected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> FrameStatsSnapshot {
        FrameStatsSnapshot {
            offered: self.offered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            detected: self.detected.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Slot
// =============================================================================

#[derive(Default)]
struct SlotState {
    pending: Option<Frame>,
    closed: bool,
}

struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
    stats: Arc<FrameStats>,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // SlotState has no invariant a panic could break mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a connected sink/source pair sharing `stats`.
pub fn frame_slot(stats: Arc<FrameStats>) -> (FrameSink, FrameSource) {
    let slot = Arc::new(Slot {
        state: Mutex::new(SlotState::default()),
        ready: Condvar::new(),
        stats,
    });
    (FrameSink { slot: slot.clone() }, FrameSource { slot })
}

/// Producer side, handed to the camera.
#[derive(Clone)]
pub struct FrameSink {
    slot: Arc<Slot>,
}

impl FrameSink {
    /// Offers a frame, evicting any frame still waiting.
    ///
    /// Returns `false` if the pipeline is closed; the frame is released
    /// immediately in that case.
    pub fn offer(&self, frame: Frame) -> bool {
        let stats = &self.slot.stats;
        stats.offered.fetch_add(1, Ordering::Relaxed);

        let evicted = {
            let mut state = self.slot.lock();
            if state.closed {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                drop(state);
                frame.release();
                return false;
            }
            state.pending.replace(frame)
        };
        self.slot.ready.notify_one();

        // Released outside the lock: the callback may call back into the camera.
        if let Some(old) = evicted {
            stats.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Evicted stale frame");
            old.release();
        }
        true
    }

    /// Closes the slot, releasing any waiting frame and waking the worker.
    pub fn close(&self) {
        let discarded = {
            let mut state = self.slot.lock();
            state.closed = true;
            state.pending.take()
        };
        self.slot.ready.notify_all();

        if let Some(frame) = discarded {
            self.slot.stats.dropped.fetch_add(1, Ordering::Relaxed);
            frame.release();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }
}

impl fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSink").finish_non_exhaustive()
    }
}

/// Consumer side, owned by the frame worker.
pub struct FrameSource {
    slot: Arc<Slot>,
}

impl FrameSource {
    /// Blocks until a frame is available.
    ///
    /// Returns `None` once the slot is closed.
    pub fn next_frame(&self) -> Option<Frame> {
        let mut state = self.slot.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(frame) = state.pending.take() {
                return Some(frame);
            }
            state = self
                .slot
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
