mod common;

use std::sync::Arc;

use audio_stream_core::processing::wav_format;
use audio_stream_core::{CaptureState, PlaybackState, StreamError, StreamSession, UploadOutcome};

use common::{config, loud, wait_until, EventLog, FileRecorder, InstantPlayer, RecordingChannel, RecordingUploadQueue};

struct Harness {
    session: StreamSession<FileRecorder>,
    feed: common::MicFeed,
    outbound: Arc<RecordingChannel>,
    player: Arc<InstantPlayer>,
    events: Arc<EventLog>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let (recorder, feed) = FileRecorder::new();
    let outbound = Arc::new(RecordingChannel::default());
    let player = Arc::new(InstantPlayer::default());
    let events = Arc::new(EventLog::default());

    let mut session = StreamSession::new(recorder, player.clone(), outbound.clone(), config(dir.path())).unwrap();
    session.set_delegate(events.clone());

    Harness {
        session,
        feed,
        outbound,
        player,
        events,
        _dir: dir,
    }
}

#[test]
fn voiced_audio_is_forwarded_and_remainder_flushed_on_stop() {
    let mut h = harness();
    h.session.start().unwrap();
    assert!(h.session.capture_state().is_capturing());

    let first = loud(6_400);
    h.feed.append(&first);
    assert!(wait_until(|| h.outbound.sends() == 1));
    assert_eq!(h.outbound.sent.lock()[0], first);

    // Below the minimum block size, so only the final flush can pick it up.
    let tail = loud(1_000);
    h.feed.append(&tail);

    let summary = h.session.stop().unwrap().unwrap();
    assert_eq!(h.outbound.sends(), 2);
    assert_eq!(h.outbound.concatenated(), [first, tail].concat());
    assert_eq!(summary.final_flush_bytes, 1_000);
    assert_eq!(summary.bytes_sent, 7_400);
    assert_eq!(summary.bytes_read, wav_format::WAV_HEADER_SIZE as u64 + 7_400);
    assert!(h.session.capture_state().is_idle());
}

#[test]
fn silence_only_produces_the_final_flush() {
    let mut h = harness();
    h.session.start().unwrap();

    // Two seconds of digital silence.
    h.feed.append(&vec![0u8; 64_000]);
    assert!(wait_until(|| h.session.diagnostics().capture.silent_blocks == 1));

    let summary = h.session.stop().unwrap().unwrap();
    assert_eq!(h.outbound.sends(), 1);
    assert!(h.outbound.sent.lock()[0].is_empty());
    assert_eq!(summary.blocks_sent, 1);
    assert_eq!(summary.final_flush_bytes, 0);
    assert_eq!(summary.silent_blocks, 1);
}

#[test]
fn capture_states_follow_the_lifecycle() {
    let mut h = harness();
    h.session.start().unwrap();
    h.session.stop().unwrap();

    assert_eq!(
        h.events.capture_states(),
        vec![
            CaptureState::Capturing { duration_secs: 0.0 },
            CaptureState::Stopping,
            CaptureState::Idle,
        ]
    );
}

#[test]
fn denied_permission_leaves_session_idle() {
    let dir = tempfile::tempdir().unwrap();
    let outbound = Arc::new(RecordingChannel::default());
    let mut session = StreamSession::new(
        FileRecorder::denied(),
        Arc::new(InstantPlayer::default()),
        outbound.clone(),
        config(dir.path()),
    )
    .unwrap();

    assert_eq!(session.start().unwrap_err(), StreamError::PermissionDenied);
    assert!(session.capture_state().is_idle());
    assert!(!session.is_capturing());
    assert_eq!(session.stop().unwrap(), None);
    assert_eq!(outbound.sends(), 0);
}

#[test]
fn recorder_setup_failure_is_capture_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = StreamSession::new(
        FileRecorder::broken(),
        Arc::new(InstantPlayer::default()),
        Arc::new(RecordingChannel::default()),
        config(dir.path()),
    )
    .unwrap();

    let err = session.start().unwrap_err();
    assert!(matches!(err, StreamError::CaptureUnavailable(_)));
    assert!(session.capture_state().is_idle());
}

#[test]
fn failed_device_start_releases_recorder_and_deletes_file() {
    let dir = tempfile::tempdir().unwrap();
    let (recorder, feed) = FileRecorder::failing_start();
    let stops = Arc::clone(&recorder.stops);
    let outbound = Arc::new(RecordingChannel::default());
    let mut session = StreamSession::new(
        recorder,
        Arc::new(InstantPlayer::default()),
        outbound.clone(),
        config(dir.path()),
    )
    .unwrap();

    let err = session.start().unwrap_err();
    assert_eq!(err, StreamError::CaptureUnavailable("device gone".into()));

    let path = feed.path().unwrap();
    assert!(!path.exists());
    assert_eq!(*stops.lock(), 1);
    assert!(session.capture_state().is_idle());
    assert!(!session.is_capturing());
    assert_eq!(session.stop().unwrap(), None);
    assert_eq!(outbound.sends(), 0);
}

#[test]
fn start_twice_is_rejected() {
    let mut h = harness();
    h.session.start().unwrap();
    assert!(matches!(h.session.start(), Err(StreamError::InvalidState(_))));
    h.session.stop().unwrap();
}

#[test]
fn stop_is_idempotent() {
    let mut h = harness();
    assert_eq!(h.session.stop().unwrap(), None);

    h.session.start().unwrap();
    assert!(h.session.stop().unwrap().is_some());
    assert_eq!(h.session.stop().unwrap(), None);
    assert_eq!(h.outbound.sends(), 1);
}

#[test]
fn capture_file_is_uploaded_then_deleted() {
    let mut h = harness();
    let queue = Arc::new(RecordingUploadQueue::default());
    h.session.set_upload_queue(queue.clone());

    h.session.start().unwrap();
    let path = h.feed.path().unwrap();
    h.feed.append(&loud(4_000));

    let summary = h.session.stop().unwrap().unwrap();
    assert!(!path.exists());
    assert_eq!(summary.upload, Some(UploadOutcome::Queued));
    assert_eq!(summary.checksum.as_ref().map(String::len), Some(64));

    let submitted = queue.submitted.lock();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0], (path, 44 + 4_000));
}

#[test]
fn restart_reads_the_new_file_from_its_header() {
    let mut h = harness();
    h.session.start().unwrap();
    h.feed.append(&loud(4_000));
    h.session.stop().unwrap();

    h.session.start().unwrap();
    let second = loud(2_000);
    h.feed.append(&second);
    let summary = h.session.stop().unwrap().unwrap();

    assert_eq!(summary.final_flush_bytes, 2_000);
    assert_eq!(h.outbound.sent.lock().last().unwrap(), &second);
}

#[test]
fn inbound_chunks_play_while_capturing() {
    let mut h = harness();
    h.session.start().unwrap();

    for seed in 0..3u8 {
        h.session.on_chunk_received(&vec![seed; 20_000], 16_000);
    }
    assert_eq!(h.player.played.lock().len(), 1);

    h.session.stop().unwrap();
    assert_eq!(h.player.played.lock().len(), 2);
    assert_eq!(h.session.playback_state(), PlaybackState::Idle);

    let diagnostics = h.session.diagnostics();
    assert_eq!(diagnostics.playback.segments_played, 2);
    assert_eq!(diagnostics.buffered_bytes, 0);
}

#[test]
fn cleanup_stops_capture_and_resets_counters() {
    let mut h = harness();
    h.session.start().unwrap();
    h.feed.append(&loud(6_400));
    assert!(wait_until(|| h.outbound.sends() == 1));
    h.session.on_chunk_received(&[1u8; 500], 16_000);

    h.session.cleanup();

    assert!(!h.session.is_capturing());
    let diagnostics = h.session.diagnostics();
    assert_eq!(diagnostics.capture.blocks_sent, 0);
    assert_eq!(diagnostics.playback.chunks_received, 0);
    assert_eq!(diagnostics.buffered_bytes, 0);
    assert!(h.events.errors().is_empty());
}

#[test]
fn malformed_capture_block_is_reported_and_skipped() {
    let mut h = harness();
    h.session.start().unwrap();

    let mut odd = loud(6_400);
    odd.push(0x01);
    h.feed.append(&odd);
    assert!(wait_until(|| h.session.diagnostics().capture.malformed_blocks == 1));

    h.session.stop().unwrap();
    assert_eq!(h.events.errors(), vec![StreamError::MalformedBlock { len: 6_401 }]);
    // The block is dropped but the cursor stays sample-aligned; the held-back
    // trailing byte goes out with the final flush.
    assert_eq!(h.outbound.concatenated(), vec![0x01]);
}
