use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::capture::cursor::{CaptureCursor, TickOutcome};
use crate::models::capture::{CaptureSession, CaptureStats};
use crate::models::config::StreamConfiguration;
use crate::models::diagnostics::StreamDiagnostics;
use crate::models::error::StreamError;
use crate::models::state::{CaptureState, PlaybackState};
use crate::models::summary::CaptureSummary;
use crate::playback::scheduler::SegmentScheduler;
use crate::storage::cache_dir::CacheDirStorage;
use crate::storage::capture_file::{self, FileCaptureSource};
use crate::traits::capture_recorder::{CaptureRecorder, CaptureSource};
use crate::traits::channels::{OutboundChannel, UploadQueue};
use crate::traits::ephemeral_storage::EphemeralStorage;
use crate::traits::segment_player::SegmentPlayer;
use crate::traits::stream_delegate::StreamDelegate;

/// Resources owned by a running capture.
struct ActiveCapture {
    uri: PathBuf,
    cursor: Arc<Mutex<CaptureCursor>>,
    /// Dropping the sender wakes and ends the polling thread.
    cancel: mpsc::Sender<()>,
    poll_handle: thread::JoinHandle<()>,
}

/// Orchestrates one streaming session: microphone capture to the outbound
/// channel, and inbound chunks to gapless playback.
///
/// ```text
/// [CaptureRecorder] → capture file → [CaptureCursor] (polled) → voice gate → [OutboundChannel]
/// inbound chunks → [SegmentScheduler] → [EphemeralStorage] → [SegmentPlayer]
/// ```
///
/// Capture and playback run independently; both may be active at once.
pub struct StreamSession<R: CaptureRecorder> {
    recorder: R,
    config: StreamConfiguration,
    source: Arc<dyn CaptureSource>,
    outbound: Arc<dyn OutboundChannel>,
    scheduler: SegmentScheduler,
    upload_queue: Option<Arc<dyn UploadQueue>>,
    delegate: Option<Arc<dyn StreamDelegate>>,
    capture_state: Arc<Mutex<CaptureState>>,
    active: Option<ActiveCapture>,
    last_capture_stats: CaptureStats,
}

impl<R: CaptureRecorder> StreamSession<R> {
    /// Create a session that reads the capture file from disk and
    /// materializes segments under `config.cache_directory`.
    pub fn new(
        recorder: R,
        player: Arc<dyn SegmentPlayer>,
        outbound: Arc<dyn OutboundChannel>,
        config: StreamConfiguration,
    ) -> Result<Self, StreamError> {
        config.validate().map_err(StreamError::ConfigurationFailed)?;
        let storage = CacheDirStorage::new(&config.cache_directory)?;
        Self::with_parts(
            recorder,
            Arc::new(FileCaptureSource),
            Arc::new(storage),
            player,
            outbound,
            config,
        )
    }

    /// Create a session from explicit collaborators.
    pub fn with_parts(
        recorder: R,
        source: Arc<dyn CaptureSource>,
        storage: Arc<dyn EphemeralStorage>,
        player: Arc<dyn SegmentPlayer>,
        outbound: Arc<dyn OutboundChannel>,
        config: StreamConfiguration,
    ) -> Result<Self, StreamError> {
        config.validate().map_err(StreamError::ConfigurationFailed)?;
        Ok(Self {
            recorder,
            config,
            source,
            outbound,
            scheduler: SegmentScheduler::new(storage, player),
            upload_queue: None,
            delegate: None,
            capture_state: Arc::new(Mutex::new(CaptureState::Idle)),
            active: None,
            last_capture_stats: CaptureStats::default(),
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn StreamDelegate>) {
        self.scheduler.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    /// Attach the offline upload queue that receives each finished capture file.
    pub fn set_upload_queue(&mut self, queue: Arc<dyn UploadQueue>) {
        self.upload_queue = Some(queue);
    }

    pub fn config(&self) -> &StreamConfiguration {
        &self.config
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture_state.lock().clone()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.scheduler.playback_state()
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Handle to the playback side, e.g. for a transport that delivers
    /// chunks from its own thread.
    pub fn scheduler(&self) -> &SegmentScheduler {
        &self.scheduler
    }

    pub fn diagnostics(&self) -> StreamDiagnostics {
        let capture = match &self.active {
            Some(active) => active.cursor.lock().stats().clone(),
            None => self.last_capture_stats.clone(),
        };
        StreamDiagnostics {
            capture,
            playback: self.scheduler.stats(),
            queued_segments: self.scheduler.queued_len(),
            buffered_bytes: self.scheduler.buffered_bytes(),
        }
    }

    /// Start capture. Transitions: idle → capturing.
    pub fn start(&mut self) -> Result<(), StreamError> {
        if self.active.is_some() {
            return Err(StreamError::InvalidState("capture already running".into()));
        }

        if !self.recorder.is_authorized()? {
            log::warn!("Microphone access not authorized");
            return Err(StreamError::PermissionDenied);
        }

        let uri = self.recorder.prepare(&self.config).map_err(capture_unavailable)?;
        if let Err(e) = self.recorder.start() {
            self.abandon_capture(&uri);
            return Err(capture_unavailable(e));
        }

        let session = CaptureSession::new();
        log::info!("Capture session {} started, writing {}", session.id, uri.display());

        let cursor = Arc::new(Mutex::new(CaptureCursor::new(
            session,
            self.config.minimum_block_bytes(),
        )));
        let (cancel, cancel_rx) = mpsc::channel();

        let handle = match self.spawn_poll_loop(uri.clone(), Arc::clone(&cursor), cancel_rx) {
            Ok(handle) => handle,
            Err(e) => {
                self.abandon_capture(&uri);
                return Err(e);
            }
        };

        self.active = Some(ActiveCapture {
            uri,
            cursor,
            cancel,
            poll_handle: handle,
        });
        self.set_capture_state(CaptureState::Capturing { duration_secs: 0.0 });
        Ok(())
    }

    /// Stop capture, flush the unsent remainder and delete the capture file.
    /// Transitions: capturing → stopping → idle.
    ///
    /// Returns `Ok(None)` when nothing is capturing.
    pub fn stop(&mut self) -> Result<Option<CaptureSummary>, StreamError> {
        let Some(ActiveCapture {
            uri,
            cursor,
            cancel,
            poll_handle,
        }) = self.active.take()
        else {
            return Ok(None);
        };

        self.set_capture_state(CaptureState::Stopping);

        // Wakes the poller at once; a tick already in progress completes.
        drop(cancel);
        if poll_handle.join().is_err() {
            log::error!("Capture poll thread panicked");
        }

        // Releasing the recorder first makes its last buffers visible to the flush.
        let uri = match self.recorder.stop() {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Recorder failed to stop cleanly: {}", e);
                uri
            }
        };

        let mut cursor = cursor.lock();
        let session = cursor.session().clone();
        let flush = cursor.finish(self.source.as_ref(), &uri);
        let final_flush_bytes = match &flush {
            Ok(block) => {
                self.outbound.send(block.as_bytes());
                block.len() as u64
            }
            Err(e) => {
                log::error!("Final capture flush failed: {}", e);
                0
            }
        };
        let stats = cursor.stats().clone();
        drop(cursor);

        let checksum = if uri.exists() {
            match capture_file::sha256_file(&uri) {
                Ok(checksum) => Some(checksum),
                Err(e) => {
                    log::warn!("Failed to checksum capture file: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let upload = match &self.upload_queue {
            Some(queue) if uri.exists() => Some(queue.submit(&uri)),
            _ => None,
        };

        remove_capture_file(&uri);

        self.scheduler.flush_remaining();

        let summary = CaptureSummary {
            session_id: session.id,
            started_at: session.started_at,
            duration_secs: session.elapsed_secs(),
            bytes_read: stats.bytes_read,
            bytes_sent: stats.bytes_sent,
            blocks_sent: stats.blocks_sent,
            silent_blocks: stats.silent_blocks,
            final_flush_bytes,
            checksum,
            upload,
        };
        self.last_capture_stats = stats;
        log::info!(
            "Capture session {} stopped: {} blocks, {} bytes sent",
            summary.session_id,
            summary.blocks_sent,
            summary.bytes_sent
        );

        self.set_capture_state(CaptureState::Idle);
        if let Some(ref delegate) = self.delegate {
            delegate.on_capture_finished(&summary);
        }

        flush?;
        Ok(Some(summary))
    }

    /// Stop capture if running, then drain playback and reset all counters.
    pub fn cleanup(&mut self) {
        if self.active.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("Stop during cleanup failed: {}", e);
            }
        }
        self.scheduler.cleanup();
        self.last_capture_stats = CaptureStats::default();
    }

    /// Inbound channel entry point: a chunk of raw PCM arrived from the peer.
    pub fn on_chunk_received(&self, pcm: &[u8], sample_rate: u32) {
        self.scheduler.ingest(pcm, sample_rate);
    }

    // --- Internal helpers ---

    /// Release the recorder and delete the prepared file after a failed start.
    fn abandon_capture(&mut self, prepared: &Path) {
        let uri = match self.recorder.stop() {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Failed to release recorder after failed start: {}", e);
                prepared.to_path_buf()
            }
        };
        remove_capture_file(&uri);
        if uri != prepared {
            remove_capture_file(prepared);
        }
    }

    fn set_capture_state(&self, new_state: CaptureState) {
        *self.capture_state.lock() = new_state.clone();
        if let Some(ref delegate) = self.delegate {
            delegate.on_capture_state_changed(&new_state);
        }
    }

    /// Poll the capture file every `poll_interval` until cancelled.
    fn spawn_poll_loop(
        &self,
        uri: PathBuf,
        cursor: Arc<Mutex<CaptureCursor>>,
        cancel_rx: mpsc::Receiver<()>,
    ) -> Result<thread::JoinHandle<()>, StreamError> {
        let interval: Duration = self.config.poll_interval();
        let source = Arc::clone(&self.source);
        let outbound = Arc::clone(&self.outbound);
        let delegate = self.delegate.clone();
        let capture_state = Arc::clone(&self.capture_state);

        thread::Builder::new()
            .name("capture-poll".into())
            .spawn(move || loop {
                match cancel_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let (outcome, duration_secs) = {
                    let mut cursor = cursor.lock();
                    let outcome = cursor.poll_tick(source.as_ref(), &uri);
                    // Sent under the lock so the final flush cannot overtake it.
                    if let Ok(TickOutcome::Emit(ref block, _)) = outcome {
                        outbound.send(block.as_bytes());
                    }
                    (outcome, cursor.session().elapsed_secs())
                };

                {
                    let mut state = capture_state.lock();
                    if state.is_capturing() {
                        *state = CaptureState::Capturing { duration_secs };
                    }
                }

                match outcome {
                    Ok(TickOutcome::Emit(block, level)) => {
                        log::debug!("Sent capture block ({} bytes, rms {:.0})", block.len(), level.rms);
                        if let Some(ref d) = delegate {
                            d.on_level_updated(&level);
                        }
                    }
                    Ok(TickOutcome::Silent(level)) => {
                        if let Some(ref d) = delegate {
                            d.on_level_updated(&level);
                        }
                    }
                    Ok(TickOutcome::Pending) => {}
                    Err(e) => {
                        log::warn!("Capture tick failed: {}", e);
                        if let Some(ref d) = delegate {
                            d.on_error(&e);
                        }
                    }
                }
            })
            .map_err(|e| StreamError::CaptureUnavailable(format!("failed to spawn poll thread: {}", e)))
    }
}

impl<R: CaptureRecorder> Drop for StreamSession<R> {
    fn drop(&mut self) {
        if self.active.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("Stop on drop failed: {}", e);
            }
        }
    }
}

fn capture_unavailable(e: StreamError) -> StreamError {
    if e.is_fatal() {
        e
    } else {
        StreamError::CaptureUnavailable(e.to_string())
    }
}

fn remove_capture_file(uri: &Path) {
    match fs::remove_file(uri) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to delete capture file {}: {}", uri.display(), e),
    }
}
