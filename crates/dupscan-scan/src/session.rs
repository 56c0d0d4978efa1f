//! # Scan Session
//!
//! One open scan screen: the frame worker, the gate, and the task that
//! drives the scan state machine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Scan Session                                    │
//! │                                                                         │
//! │  camera ──► FrameSink ──► [slot] ──► FrameWorker (std thread)          │
//! │                                          │ decode, try_pause()          │
//! │                                          ▼                              │
//! │                                   mpsc<String> detections               │
//! │                                          │                              │
//! │  ScanSession handle                      ▼                              │
//! │  ├── dismiss() ──────┐        ┌──────────────────────────────────┐     │
//! │  ├── force_add() ────┼──────► │ SessionDriver (tokio task)       │     │
//! │  │   mpsc<Command>   │        │                                  │     │
//! │  │                   │        │ select! {                        │     │
//! │  │                   │        │   cancelled    → stop            │     │
//! │  │                   │        │   display timer → Idle + reopen  │     │
//! │  │                   │        │   detection    → resolve/commit  │     │
//! │  │                   │        │   command      → transition      │     │
//! │  │                   │        │ }                                │     │
//! │  │                   │        └───────────────┬──────────────────┘     │
//! │  ├── state() ◄───────┴──── watch<ScanState> ◄─┘                        │
//! │  └── close()  → cancel token, close slot, join                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancellation
//! Every commit receives a child of the session's token. Closing or
//! dropping the session cancels it; a commit that has not reached COMMIT
//! by then rolls back and the cycle ends without a state change.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ScanSettings;
use crate::decoder::Decoder;
use crate::error::{ScanError, ScanResult};
use crate::frame::{frame_slot, FrameSink, FrameStats, FrameStatsSnapshot};
use crate::gate::{GateReleaser, ScanGate};
use crate::resolver::{DuplicateResolver, Resolution};
use crate::worker::FrameWorker;
use dupscan_core::{CoreResult, Effect, ScanEvent, ScanState};
use dupscan_db::Database;

/// Capacity of the user command channel.
const COMMAND_BUFFER: usize = 8;

type Reply = oneshot::Sender<CoreResult<ScanState>>;

/// User commands sent to the driver.
#[derive(Debug)]
enum Command {
    Dismiss(Reply),
    ForceAdd(Reply),
}

// =============================================================================
// Session Handle
// =============================================================================

/// Handle to a running scan session.
///
/// ## Example
/// ```rust,ignore
/// let session = ScanSession::open(db, Some(list.id), PayloadDecoder, &settings)?;
/// let sink = session.frame_sink();
/// camera.on_frame(move |frame| { sink.offer(frame); });
///
/// let mut states = session.subscribe();
/// while states.changed().await.is_ok() {
///     if let ScanState::Duplicate(_) = &*states.borrow() {
///         // ask the user, then session.dismiss() or session.force_add()
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ScanSession {
    list_id: Option<String>,
    state_rx: watch::Receiver<ScanState>,
    last_value_rx: watch::Receiver<Option<String>>,
    commands: mpsc::Sender<Command>,
    sink: FrameSink,
    gate: ScanGate,
    stats: Arc<FrameStats>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    worker: Option<FrameWorker>,
}

impl ScanSession {
    /// Opens a session scanning into `list_id`.
    ///
    /// Starts the frame worker thread and the driver task. Must be called
    /// from within a tokio runtime.
    ///
    /// A session without a list still runs, but every detection ends in
    /// `Error(MissingListContext)`.
    pub fn open(
        db: Database,
        list_id: Option<String>,
        decoder: impl Decoder,
        settings: &ScanSettings,
    ) -> ScanResult<Self> {
        if settings.detection_buffer == 0 {
            return Err(ScanError::InvalidConfig(
                "scan.detection_buffer must be greater than 0".into(),
            ));
        }

        let stats = Arc::new(FrameStats::default());
        let (sink, source) = frame_slot(stats.clone());
        let gate = ScanGate::new();
        let (detection_tx, detection_rx) = mpsc::channel(settings.detection_buffer);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ScanState::Idle);
        let (last_value_tx, last_value_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let worker = FrameWorker::spawn(
            source,
            Box::new(decoder),
            gate.trigger(),
            detection_tx,
            stats.clone(),
        )?;

        let driver = SessionDriver {
            list_id: list_id.clone(),
            resolver: DuplicateResolver::new(db),
            releaser: gate.releaser(),
            state: ScanState::Idle,
            state_tx,
            last_value_tx,
            display: settings.success_display(),
            display_deadline: None,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.run(detection_rx, command_rx));

        info!(list_id = ?list_id, "Scan session opened");

        Ok(ScanSession {
            list_id,
            state_rx,
            last_value_rx,
            commands: command_tx,
            sink,
            gate,
            stats,
            cancel,
            task: Some(task),
            worker: Some(worker),
        })
    }

    /// The list detections are committed to.
    pub fn list_id(&self) -> Option<&str> {
        self.list_id.as_deref()
    }

    /// Current state, for display.
    pub fn state(&self) -> ScanState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state_rx.clone()
    }

    /// State changes as a `Stream`, starting with the current state.
    pub fn state_stream(&self) -> WatchStream<ScanState> {
        WatchStream::new(self.state_rx.clone())
    }

    /// Most recent value forwarded by the gate.
    pub fn last_value(&self) -> Option<String> {
        self.last_value_rx.borrow().clone()
    }

    /// Producer handle for the camera.
    pub fn frame_sink(&self) -> FrameSink {
        self.sink.clone()
    }

    pub fn gate_is_open(&self) -> bool {
        self.gate.is_open()
    }

    pub fn stats(&self) -> FrameStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dismisses a duplicate or error. Returns the new state.
    ///
    /// Rejected with [`ScanError::Rejected`] in any other state.
    pub async fn dismiss(&self) -> ScanResult<ScanState> {
        self.send(Command::Dismiss).await
    }

    /// Stores a pending duplicate anyway. Returns the state after the
    /// insert completes: `Idle`, or `Error` if the insert failed.
    ///
    /// Rejected with [`ScanError::Rejected`] unless the state is `Duplicate`.
    pub async fn force_add(&self) -> ScanResult<ScanState> {
        self.send(Command::ForceAdd).await
    }

    async fn send(&self, command: impl FnOnce(Reply) -> Command) -> ScanResult<ScanState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| ScanError::SessionClosed)?;
        let result = reply_rx.await.map_err(|_| ScanError::SessionClosed)?;
        Ok(result?)
    }

    /// Stops the session: cancels outstanding commits, releases any waiting
    /// frame, and waits for the worker and driver to finish.
    pub async fn close(mut self) -> ScanResult<()> {
        self.shutdown_signal();

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| ScanError::Internal(format!("session task failed: {e}")))?;
        }

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| ScanError::Internal(e.to_string()))??;
        }

        info!(stats = ?self.stats.snapshot(), "Scan session closed");
        Ok(())
    }

    fn shutdown_signal(&self) {
        self.cancel.cancel();
        self.sink.close();
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        // No-op after close(); otherwise the threads wind down on their own.
        self.shutdown_signal();
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Owns the state machine; the only holder of the gate releaser.
struct SessionDriver {
    list_id: Option<String>,
    resolver: DuplicateResolver,
    releaser: GateReleaser,
    state: ScanState,
    state_tx: watch::Sender<ScanState>,
    last_value_tx: watch::Sender<Option<String>>,
    display: Duration,
    display_deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl SessionDriver {
    async fn run(
        mut self,
        mut detections: mpsc::Receiver<String>,
        mut commands: mpsc::Receiver<Command>,
    ) {
        let cancel = self.cancel.clone();

        loop {
            let deadline = self.display_deadline;

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = wait_until(deadline) => {
                    self.display_deadline = None;
                    self.dispatch_logged(ScanEvent::DisplayTimeoutElapsed).await;
                }

                Some(value) = detections.recv() => self.on_detection(value).await,

                Some(command) = commands.recv() => match command {
                    Command::Dismiss(reply) => {
                        let result = self.dispatch(ScanEvent::Dismiss).await;
                        let _ = reply.send(result);
                    }
                    Command::ForceAdd(reply) => {
                        let result = self.dispatch(ScanEvent::ForceAdd).await;
                        let _ = reply.send(result);
                    }
                },

                else => break,
            }
        }

        debug!("Session driver stopped");
    }

    async fn on_detection(&mut self, value: String) {
        debug!(value = %value, "Resolving detection");
        self.last_value_tx.send_replace(Some(value.clone()));

        let resolution = self
            .resolver
            .resolve(self.list_id.as_deref(), &value, &self.cancel.child_token())
            .await;

        let event = match resolution {
            Resolution::Committed(_) => ScanEvent::Committed(value),
            Resolution::Duplicate => ScanEvent::DuplicateFound(value),
            Resolution::Failed(failure) => ScanEvent::Failed(failure),
            Resolution::Cancelled => return,
        };
        self.dispatch_logged(event).await;
    }

    async fn dispatch_logged(&mut self, event: ScanEvent) {
        if let Err(e) = self.dispatch(event).await {
            // The gate admits detections only in Idle, so this is a bug
            // elsewhere; keep the current state.
            warn!(error = %e, "Ignoring event");
        }
    }

    /// Applies `event` and every follow-up event its effects produce.
    async fn dispatch(&mut self, event: ScanEvent) -> CoreResult<ScanState> {
        let mut next = Some(event);

        while let Some(event) = next.take() {
            let event_name = event.name();
            let transition = self.state.apply(event)?;

            debug!(
                from = self.state.name(),
                to = transition.state.name(),
                event = event_name,
                "Scan transition"
            );
            self.state = transition.state;
            self.state_tx.send_replace(self.state.clone());

            next = self.run_effect(transition.effect).await;
        }

        Ok(self.state.clone())
    }

    async fn run_effect(&mut self, effect: Effect) -> Option<ScanEvent> {
        match effect {
            Effect::None => None,
            Effect::StartDisplayTimer => {
                self.display_deadline = Some(Instant::now() + self.display);
                None
            }
            Effect::ReopenGate => {
                self.display_deadline = None;
                if !self.releaser.reopen() {
                    warn!("Gate was already open");
                }
                None
            }
            Effect::ForceInsert(value) => {
                let resolution = self
                    .resolver
                    .force_add(self.list_id.as_deref(), &value, &self.cancel.child_token())
                    .await;

                match resolution {
                    Resolution::Committed(_) => Some(ScanEvent::ForceAddCommitted),
                    Resolution::Failed(failure) => Some(ScanEvent::Failed(failure)),
                    Resolution::Duplicate | Resolution::Cancelled => None,
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
