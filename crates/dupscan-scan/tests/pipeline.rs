//! End-to-end scan pipeline tests: frame sink → worker → gate → session →
//! store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use dupscan_core::{ScanFailure, ScanState};
use dupscan_db::{Database, DbConfig};
use dupscan_scan::{Frame, PayloadDecoder, Rotation, ScanError, ScanSession, ScanSettings};

// =============================================================================
// Helpers
// =============================================================================

fn settings(success_display_ms: u64) -> ScanSettings {
    ScanSettings {
        success_display_ms,
        detection_buffer: 1,
    }
}

fn frame(text: &str) -> Frame {
    Frame::new(text.as_bytes().to_vec(), 1, 1, Rotation::Deg0)
}

fn counted_frame(text: &str, released: &Arc<AtomicUsize>) -> Frame {
    let released = released.clone();
    frame(text).on_release(move || {
        released.fetch_add(1, Ordering::SeqCst);
    })
}

async fn setup() -> (Database, String) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let list = db.lists().create("Pipeline").await.unwrap();
    (db, list.id)
}

async fn wait_for(
    states: &mut watch::Receiver<ScanState>,
    pred: impl FnMut(&ScanState) -> bool,
) -> ScanState {
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(pred))
        .await
        .expect("timed out waiting for scan state")
        .expect("session closed")
        .clone()
}

async fn scan(session: &ScanSession, value: &str) -> ScanState {
    let mut states = session.subscribe();
    session.frame_sink().offer(frame(value));
    wait_for(&mut states, |s| !s.is_idle()).await
}

// =============================================================================
// Scan Cycles
// =============================================================================

#[tokio::test]
async fn empty_list_scan_succeeds_then_reopens_after_display_timeout() {
    let (db, list_id) = setup().await;
    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(3000))
            .unwrap();

    assert_eq!(scan(&session, "123").await, ScanState::Success("123".into()));
    assert!(!session.gate_is_open());

    let rows = db.barcodes().list_for_list(&list_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].list_id, list_id);
    assert_eq!(rows[0].value, "123");

    // No user input: the display timeout alone returns to Idle
    tokio::time::pause();
    tokio::time::advance(Duration::from_millis(3000)).await;
    let mut states = session.subscribe();
    states.wait_for(ScanState::is_idle).await.unwrap();
    assert!(session.gate_is_open());
    tokio::time::resume();

    // And the reopened gate accepts the next detection
    assert_eq!(scan(&session, "456").await, ScanState::Success("456".into()));
    assert_eq!(db.barcodes().count_for_list(&list_id).await.unwrap(), 2);

    session.close().await.unwrap();
}

#[tokio::test]
async fn duplicate_then_force_add_stores_second_row() {
    let (db, list_id) = setup().await;
    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(20))
            .unwrap();

    let mut states = session.subscribe();
    assert_eq!(scan(&session, "123").await, ScanState::Success("123".into()));
    wait_for(&mut states, ScanState::is_idle).await;

    assert_eq!(scan(&session, "123").await, ScanState::Duplicate("123".into()));
    assert!(!session.gate_is_open());

    assert_eq!(session.force_add().await.unwrap(), ScanState::Idle);
    assert!(session.gate_is_open());

    let rows = db.barcodes().list_for_list(&list_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|b| b.value == "123"));

    session.close().await.unwrap();
}

#[tokio::test]
async fn duplicate_then_dismiss_stores_nothing() {
    let (db, list_id) = setup().await;
    let cancel = tokio_util::sync::CancellationToken::new();
    db.barcodes()
        .commit_if_absent(&list_id, "123", &cancel)
        .await
        .unwrap();

    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(20))
            .unwrap();

    assert_eq!(scan(&session, "123").await, ScanState::Duplicate("123".into()));
    assert_eq!(session.dismiss().await.unwrap(), ScanState::Idle);
    assert!(session.gate_is_open());
    assert_eq!(db.barcodes().count_for_list(&list_id).await.unwrap(), 1);

    session.close().await.unwrap();
}

#[tokio::test]
async fn rapid_identical_frames_commit_once() {
    let (db, list_id) = setup().await;
    // Long banner so the gate stays paused for the whole burst
    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(60_000))
            .unwrap();
    let mut states = session.subscribe();
    let sink = session.frame_sink();

    for _ in 0..30 {
        sink.offer(frame("123"));
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let state = wait_for(&mut states, |s| !s.is_idle()).await;
    assert_eq!(state, ScanState::Success("123".into()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state(), ScanState::Success("123".into()));
    assert!(!session.gate_is_open());
    assert_eq!(db.barcodes().count_for_list(&list_id).await.unwrap(), 1);

    session.close().await.unwrap();
}

#[tokio::test]
async fn concurrent_sessions_on_one_list_store_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("pipeline.db")).max_connections(4))
        .await
        .unwrap();
    let list = db.lists().create("Shared").await.unwrap();

    let a = ScanSession::open(db.clone(), Some(list.id.clone()), PayloadDecoder, &settings(60_000))
        .unwrap();
    let b = ScanSession::open(db.clone(), Some(list.id.clone()), PayloadDecoder, &settings(60_000))
        .unwrap();

    let (state_a, state_b) = tokio::join!(scan(&a, "4006381333931"), scan(&b, "4006381333931"));

    let successes = [&state_a, &state_b]
        .iter()
        .filter(|s| matches!(s, ScanState::Success(_)))
        .count();
    let duplicates = [&state_a, &state_b]
        .iter()
        .filter(|s| matches!(s, ScanState::Duplicate(_)))
        .count();
    assert_eq!((successes, duplicates), (1, 1));
    assert_eq!(db.barcodes().count_for_list(&list.id).await.unwrap(), 1);

    a.close().await.unwrap();
    b.close().await.unwrap();
    db.close().await;
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn detection_without_list_is_missing_list_context() {
    let (db, _) = setup().await;
    let session = ScanSession::open(db.clone(), None, PayloadDecoder, &settings(20)).unwrap();

    assert_eq!(
        scan(&session, "123").await,
        ScanState::Error(ScanFailure::MissingListContext)
    );
    assert!(!session.gate_is_open());
    assert!(matches!(
        session.force_add().await,
        Err(ScanError::Rejected(_))
    ));

    assert_eq!(session.dismiss().await.unwrap(), ScanState::Idle);
    assert!(session.gate_is_open());

    session.close().await.unwrap();
}

#[tokio::test]
async fn list_deleted_under_session_is_missing_list_context() {
    let (db, list_id) = setup().await;
    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(20))
            .unwrap();
    assert_eq!(session.list_id(), Some(list_id.as_str()));

    db.lists().delete(&list_id).await.unwrap();

    let state = scan(&session, "123").await;
    assert_eq!(state, ScanState::Error(ScanFailure::MissingListContext));
    assert!(state.awaits_user());
    assert!(!session.gate_is_open());

    assert_eq!(session.dismiss().await.unwrap(), ScanState::Idle);
    assert!(session.gate_is_open());
    assert_eq!(db.barcodes().count_for_list(&list_id).await.unwrap(), 0);

    session.close().await.unwrap();
}

#[tokio::test]
async fn store_failure_surfaces_as_error_state() {
    let (db, list_id) = setup().await;
    let session =
        ScanSession::open(db.clone(), Some(list_id), PayloadDecoder, &settings(20)).unwrap();
    db.close().await;

    let state = scan(&session, "123").await;
    assert!(matches!(
        state,
        ScanState::Error(ScanFailure::PersistenceFailure { .. })
    ));

    // No retry: the error holds until dismissed
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state(), state);
    assert_eq!(session.dismiss().await.unwrap(), ScanState::Idle);

    session.close().await.unwrap();
}

#[tokio::test]
async fn decode_failures_never_reach_the_state_machine() {
    let (db, list_id) = setup().await;
    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(20))
            .unwrap();
    let sink = session.frame_sink();

    sink.offer(Frame::new(vec![0xff, 0xfe, 0xfd], 3, 1, Rotation::Deg90));
    sink.offer(Frame::without_image(1280, 720, Rotation::Deg0));
    sink.offer(frame(""));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(session.state(), ScanState::Idle);
    assert!(session.gate_is_open());
    assert_eq!(db.barcodes().count_for_list(&list_id).await.unwrap(), 0);

    session.close().await.unwrap();
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn every_frame_is_released_exactly_once() {
    let (db, list_id) = setup().await;
    let session =
        ScanSession::open(db.clone(), Some(list_id), PayloadDecoder, &settings(60_000)).unwrap();
    let sink = session.frame_sink();
    let released = Arc::new(AtomicUsize::new(0));

    for i in 0..40 {
        sink.offer(counted_frame(&format!("{}", i % 3), &released));
        if i % 10 == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    let stats = session.stats();
    session.close().await.unwrap();

    assert_eq!(stats.offered, 40);
    assert_eq!(released.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn close_stops_accepting_frames_and_commands() {
    let (db, list_id) = setup().await;
    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(20))
            .unwrap();
    let sink = session.frame_sink();
    assert!(!sink.is_closed());
    session.close().await.unwrap();
    assert!(sink.is_closed());

    let released = Arc::new(AtomicUsize::new(0));
    assert!(!sink.offer(counted_frame("123", &released)));
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(db.barcodes().count_for_list(&list_id).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_during_commit_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(DbConfig::new(dir.path().join("close.db")).max_connections(2))
        .await
        .unwrap();
    let list = db.lists().create("Closing").await.unwrap();
    let mut changes = db.subscribe_changes();

    // Hold the write lock so the session's commit waits on it
    let mut blocker = db.pool().begin().await.unwrap();
    sqlx::query("UPDATE barcode_lists SET name = name")
        .execute(&mut *blocker)
        .await
        .unwrap();

    let session =
        ScanSession::open(db.clone(), Some(list.id.clone()), PayloadDecoder, &settings(60_000))
            .unwrap();
    let states = session.subscribe();
    session.frame_sink().offer(frame("123"));

    // Let the detection reach the store before closing
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!session.gate_is_open());

    let (closed, _) = tokio::join!(session.close(), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        blocker.rollback().await.unwrap();
    });
    closed.unwrap();

    assert_eq!(*states.borrow(), ScanState::Idle);
    assert_eq!(db.barcodes().count_for_list(&list.id).await.unwrap(), 0);
    assert!(changes.try_recv().is_err());
    db.close().await;
}

#[tokio::test]
async fn live_list_view_follows_session_commits() {
    let (db, list_id) = setup().await;
    let mut live = db.barcodes().live_for_list(&list_id).await.unwrap();
    let session =
        ScanSession::open(db.clone(), Some(list_id.clone()), PayloadDecoder, &settings(20))
            .unwrap();

    assert_eq!(scan(&session, "777").await, ScanState::Success("777".into()));

    let snapshot = tokio::time::timeout(Duration::from_secs(5), live.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].value, "777");

    session.close().await.unwrap();
}
