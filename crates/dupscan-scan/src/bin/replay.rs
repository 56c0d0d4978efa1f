//! # Frame Replay
//!
//! Feeds recorded frames through a real scan session, for development
//! without a camera.
//!
//! ## Usage
//! ```bash
//! # Every file in ./frames is one frame; its text content is the code
//! cargo run -p dupscan-scan --bin replay -- --list "Inbound Dock" ./frames
//!
//! # Store duplicates anyway instead of dismissing them
//! cargo run -p dupscan-scan --bin replay -- --list Returns --on-duplicate force ./frames
//! ```
//!
//! Files are replayed in name order. An empty file stands for a frame the
//! camera delivered without image data.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::oneshot;
use tracing::{info, warn};

use dupscan_core::{BarcodeList, ScanState};
use dupscan_db::Database;
use dupscan_scan::{
    init_tracing, Frame, PayloadDecoder, Rotation, ScanResult, ScanSession, ScannerConfig,
};

/// What to do when a replayed code is already in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DuplicatePolicy {
    Dismiss,
    Force,
}

#[derive(Debug, Parser)]
#[command(name = "replay", about = "Replay frame files through a DupScan scan session")]
struct Args {
    /// Config file (defaults to the platform config dir's scanner.toml)
    #[arg(short, long, env = "DUPSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Name of the list to scan into; created if it does not exist
    #[arg(short, long)]
    list: String,

    /// How to resolve duplicates
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::Dismiss)]
    on_duplicate: DuplicatePolicy,

    /// How long to wait for a frame to produce a detection
    #[arg(long, default_value_t = 200)]
    frame_wait_ms: u64,

    /// Directory of frame files
    frames: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = ScannerConfig::load(args.config.clone())?;
    init_tracing(&config.logging.filter);

    let db = Database::new(config.database.db_config()).await?;
    let list = find_or_create_list(&db, &args.list).await?;
    info!(list = %list.name, id = %list.id, "Replaying into list");

    let session = ScanSession::open(db.clone(), Some(list.id.clone()), PayloadDecoder, &config.scan)?;
    info!(list_id = ?session.list_id(), "Scan session ready");

    let mut states = session.subscribe();
    let frame_wait = Duration::from_millis(args.frame_wait_ms);
    // Success holds the gate for the display timeout; allow for it.
    let settle = config.scan.success_display() + Duration::from_secs(5);

    for path in frame_files(&args.frames)? {
        let detected_before = session.stats().detected;
        let (processed_tx, processed_rx) = oneshot::channel();
        let frame = load_frame(&path)?.on_release(move || {
            let _ = processed_tx.send(());
        });
        session.frame_sink().offer(frame);

        // The worker counts a frame before releasing it, so once released
        // the stats tell whether it produced a detection.
        if tokio::time::timeout(frame_wait, processed_rx).await.is_err() {
            warn!(file = %path.display(), "Frame not processed in time");
            continue;
        }
        if session.stats().detected == detected_before {
            info!(file = %path.display(), "No detection");
            continue;
        }

        let state = match tokio::time::timeout(settle, states.wait_for(|s| !s.is_idle())).await {
            Ok(Ok(state)) => state.clone(),
            Ok(Err(_)) => break,
            Err(_) => {
                warn!(file = %path.display(), "Detection did not resolve in time");
                continue;
            }
        };

        match state {
            ScanState::Success(value) => {
                info!(file = %path.display(), value = %value, "Stored");
                tokio::time::timeout(settle, states.wait_for(ScanState::is_idle)).await??;
            }
            ScanState::Duplicate(value) => {
                info!(file = %path.display(), value = %value, policy = ?args.on_duplicate, "Duplicate");
                let after = match args.on_duplicate {
                    DuplicatePolicy::Dismiss => session.dismiss().await?,
                    DuplicatePolicy::Force => session.force_add().await?,
                };
                if let ScanState::Error(failure) = &after {
                    warn!(error = %failure, "Forced insert failed");
                }
                if after.awaits_user() {
                    session.dismiss().await?;
                }
            }
            ScanState::Error(failure) => {
                warn!(file = %path.display(), error = %failure, "Scan failed");
                session.dismiss().await?;
            }
            ScanState::Idle => {}
        }
    }

    let stats = session.stats();
    session.close().await?;

    let stored = db.barcodes().count_for_list(&list.id).await?;
    info!(
        list = %list.name,
        stored,
        offered = stats.offered,
        dropped = stats.dropped,
        detected = stats.detected,
        "Replay complete"
    );

    db.close().await;
    Ok(())
}

async fn find_or_create_list(db: &Database, name: &str) -> ScanResult<BarcodeList> {
    let existing = db
        .lists()
        .list_all()
        .await?
        .into_iter()
        .find(|list| list.name == name.trim());

    match existing {
        Some(list) => Ok(list),
        None => Ok(db.lists().create(name).await?),
    }
}

fn frame_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_frame(path: &Path) -> std::io::Result<Frame> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Ok(Frame::without_image(0, 0, Rotation::Deg0));
    }

    let width = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    Ok(Frame::new(bytes, width, 1, Rotation::Deg0))
}
