//! # Frame Worker
//!
//! The one dedicated thread that owns frame acquisition and decode.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Frame Worker Loop                                  │
//! │                                                                         │
//! │  next_frame() ──► gate open? ──no──► release, loop                     │
//! │                       │ yes                                             │
//! │                       ▼                                                 │
//! │                   decode_frame ──► count, release frame                 │
//! │                       │                                                 │
//! │                 value? ──no──► loop                                     │
//! │                       │ yes                                             │
//! │                       ▼                                                 │
//! │                 try_pause() ──lost──► discard, loop                     │
//! │                       │ won                                             │
//! │                       ▼                                                 │
//! │                 send to session ──closed──► exit                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The worker never touches the Store and never waits for the user.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::decoder::{decode_frame, Decoder};
use crate::error::{ScanError, ScanResult};
use crate::frame::{FrameSource, FrameStats};
use crate::gate::GateTrigger;

const THREAD_NAME: &str = "dupscan-frames";

/// Handle to the running frame thread.
#[derive(Debug)]
pub struct FrameWorker {
    handle: JoinHandle<()>,
}

impl FrameWorker {
    /// Starts the frame thread.
    ///
    /// It runs until the frame slot is closed or the session stops
    /// receiving detections.
    pub fn spawn(
        source: FrameSource,
        decoder: Box<dyn Decoder>,
        gate: GateTrigger,
        detections: mpsc::Sender<String>,
        stats: Arc<FrameStats>,
    ) -> ScanResult<Self> {
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(source, decoder, gate, detections, stats))
            .map_err(|e| ScanError::WorkerSpawnFailed(e.to_string()))?;

        Ok(FrameWorker { handle })
    }

    /// Blocks until the thread exits.
    pub fn join(self) -> ScanResult<()> {
        self.handle
            .join()
            .map_err(|_| ScanError::Internal("frame worker panicked".into()))
    }
}

fn run(
    source: FrameSource,
    decoder: Box<dyn Decoder>,
    gate: GateTrigger,
    detections: mpsc::Sender<String>,
    stats: Arc<FrameStats>,
) {
    info!("Frame worker started");

    while let Some(frame) = source.next_frame() {
        if !gate.is_open() {
            frame.release();
            continue;
        }

        let value = decode_frame(decoder.as_ref(), &frame);
        // Counted before release: a released frame is fully accounted for
        stats.record_decoded(value.is_some());
        frame.release();

        let Some(value) = value else {
            continue;
        };

        if !gate.try_pause() {
            trace!("Gate already paused, discarding detection");
            continue;
        }

        debug!(value = %value, "Detection forwarded");
        if detections.blocking_send(value).is_err() {
            debug!("Session gone, frame worker exiting");
            break;
        }
    }

    info!("Frame worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::PayloadDecoder;
    use crate::frame::{frame_slot, Frame, Rotation};
    use crate::gate::ScanGate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn text_frame(text: &str, released: &Arc<AtomicUsize>) -> Frame {
        let released = released.clone();
        Frame::new(text.as_bytes().to_vec(), 1, 1, Rotation::Deg0).on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_forwards_one_detection_until_reopened() {
        let stats = Arc::new(FrameStats::default());
        let (sink, source) = frame_slot(stats.clone());
        let gate = ScanGate::new();
        let releaser = gate.releaser();
        let (tx, mut rx) = mpsc::channel(1);
        let released = Arc::new(AtomicUsize::new(0));

        let worker =
            FrameWorker::spawn(source, Box::new(PayloadDecoder), gate.trigger(), tx, stats.clone())
                .unwrap();

        sink.offer(text_frame("123", &released));
        assert_eq!(rx.blocking_recv(), Some("123".to_string()));
        assert!(!gate.is_open());

        // While paused, frames are released without being forwarded
        for _ in 0..5 {
            sink.offer(text_frame("123", &released));
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        while released.load(Ordering::SeqCst) < 6 {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert!(rx.try_recv().is_err());

        assert!(releaser.reopen());
        sink.offer(text_frame("456", &released));
        assert_eq!(rx.blocking_recv(), Some("456".to_string()));

        sink.close();
        worker.join().unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(released.load(Ordering::SeqCst) as u64, snapshot.offered);
        assert_eq!(snapshot.detected, 2);
    }

    #[test]
    fn test_frame_counted_before_release() {
        let stats = Arc::new(FrameStats::default());
        let (sink, source) = frame_slot(stats.clone());
        let gate = ScanGate::new();
        let (tx, mut rx) = mpsc::channel(1);
        let (seen_tx, seen_rx) = std::sync::mpsc::channel();

        let worker =
            FrameWorker::spawn(source, Box::new(PayloadDecoder), gate.trigger(), tx, stats.clone())
                .unwrap();

        let counters = stats.clone();
        sink.offer(
            Frame::new(b"123".to_vec(), 1, 1, Rotation::Deg0).on_release(move || {
                let snapshot = counters.snapshot();
                let _ = seen_tx.send((snapshot.decoded, snapshot.detected));
            }),
        );

        assert_eq!(seen_rx.recv().unwrap(), (1, 1));
        assert_eq!(rx.blocking_recv(), Some("123".to_string()));

        sink.close();
        worker.join().unwrap();
    }

    #[test]
    fn test_exits_when_session_drops_receiver() {
        let stats = Arc::new(FrameStats::default());
        let (sink, source) = frame_slot(stats.clone());
        let gate = ScanGate::new();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let worker =
            FrameWorker::spawn(source, Box::new(PayloadDecoder), gate.trigger(), tx, stats)
                .unwrap();
        sink.offer(Frame::new(b"789".to_vec(), 1, 1, Rotation::Deg0));

        worker.join().unwrap();
    }
}
