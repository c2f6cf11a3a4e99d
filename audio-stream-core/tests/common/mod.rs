#![allow(dead_code)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use audio_stream_core::processing::wav_format;
use audio_stream_core::{
    CaptureRecorder, CaptureState, CaptureSummary, OutboundChannel, PcmBlock, PlaybackCallback, PlaybackHandle,
    PlaybackOutcome, PlaybackSegment, PlaybackState, SegmentPlayer, StreamConfiguration, StreamDelegate, StreamError,
    UploadOutcome, UploadQueue, VoiceLevel,
};

pub fn config(dir: &Path) -> StreamConfiguration {
    StreamConfiguration {
        poll_interval_ms: 10,
        minimum_block_ms: 100,
        capture_directory: dir.join("capture"),
        cache_directory: dir.join("cache"),
    }
}

/// Alternating full-scale samples, well above the voice threshold.
pub fn loud(bytes: usize) -> Vec<u8> {
    let samples: Vec<i16> = (0..bytes / 2).map(|i| if i % 2 == 0 { 12000 } else { -12000 }).collect();
    PcmBlock::from_samples(&samples).into_bytes()
}

pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Writes to whatever capture file the recorder currently has open.
#[derive(Clone, Default)]
pub struct MicFeed {
    current: Arc<Mutex<Option<PathBuf>>>,
}

impl MicFeed {
    pub fn append(&self, bytes: &[u8]) {
        let path = self.current.lock().clone().expect("no capture file prepared");
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.current.lock().clone()
    }
}

/// Recorder backed by a real file; audio is supplied through [`MicFeed`].
pub struct FileRecorder {
    authorized: bool,
    fail_prepare: bool,
    fail_start: bool,
    feed: MicFeed,
    files_created: usize,
    pub stops: Arc<Mutex<usize>>,
}

impl FileRecorder {
    pub fn new() -> (Self, MicFeed) {
        let feed = MicFeed::default();
        let recorder = Self {
            authorized: true,
            fail_prepare: false,
            fail_start: false,
            feed: feed.clone(),
            files_created: 0,
            stops: Arc::new(Mutex::new(0)),
        };
        (recorder, feed)
    }

    pub fn denied() -> Self {
        let (mut recorder, _) = Self::new();
        recorder.authorized = false;
        recorder
    }

    /// Prepares a file normally but the device refuses to start.
    pub fn failing_start() -> (Self, MicFeed) {
        let (mut recorder, feed) = Self::new();
        recorder.fail_start = true;
        (recorder, feed)
    }

    pub fn broken() -> Self {
        let (mut recorder, _) = Self::new();
        recorder.fail_prepare = true;
        recorder
    }
}

impl CaptureRecorder for FileRecorder {
    fn is_authorized(&self) -> Result<bool, StreamError> {
        Ok(self.authorized)
    }

    fn prepare(&mut self, config: &StreamConfiguration) -> Result<PathBuf, StreamError> {
        if self.fail_prepare {
            return Err(StreamError::StorageWriteFailure("disk full".into()));
        }
        fs::create_dir_all(&config.capture_directory).unwrap();
        self.files_created += 1;
        let path = config.capture_directory.join(format!("capture-{}.wav", self.files_created));
        fs::write(&path, wav_format::generate_wav_header(16000, 16, 1, 0)).unwrap();
        *self.feed.current.lock() = Some(path.clone());
        Ok(path)
    }

    fn start(&mut self) -> Result<(), StreamError> {
        if self.fail_start {
            return Err(StreamError::CaptureUnavailable("device gone".into()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<PathBuf, StreamError> {
        *self.stops.lock() += 1;
        self.feed
            .path()
            .ok_or_else(|| StreamError::InvalidState("recorder was never prepared".into()))
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    pub sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingChannel {
    pub fn sends(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn concatenated(&self) -> Vec<u8> {
        self.sent.lock().concat()
    }
}

impl OutboundChannel for RecordingChannel {
    fn send(&self, pcm: &[u8]) {
        self.sent.lock().push(pcm.to_vec());
    }
}

/// Player that finishes every segment before `play` returns.
#[derive(Default)]
pub struct InstantPlayer {
    pub played: Mutex<Vec<Vec<u8>>>,
}

impl SegmentPlayer for InstantPlayer {
    fn play(&self, path: &Path, on_finished: PlaybackCallback) -> Result<PlaybackHandle, StreamError> {
        let bytes = fs::read(path).map_err(|e| StreamError::ReadFailure(e.to_string()))?;
        self.played.lock().push(bytes);
        on_finished(PlaybackOutcome::Finished);
        Ok(PlaybackHandle(0))
    }

    fn unload(&self, _handle: PlaybackHandle) {}
}

/// Upload queue that checks the file is still present when submitted.
#[derive(Default)]
pub struct RecordingUploadQueue {
    pub submitted: Mutex<Vec<(PathBuf, u64)>>,
}

impl UploadQueue for RecordingUploadQueue {
    fn submit(&self, file: &Path) -> UploadOutcome {
        match fs::metadata(file) {
            Ok(meta) => {
                self.submitted.lock().push((file.to_path_buf(), meta.len()));
                UploadOutcome::Queued
            }
            Err(e) => UploadOutcome::Rejected(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Capture(CaptureState),
    Playback(PlaybackState),
    Level(bool),
    Error(StreamError),
    SegmentFinished(u64),
    CaptureFinished(u64),
}

#[derive(Default)]
pub struct EventLog {
    pub events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn capture_states(&self) -> Vec<CaptureState> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Capture(CaptureState::Capturing { .. }) => {
                    Some(CaptureState::Capturing { duration_secs: 0.0 })
                }
                Event::Capture(state) => Some(state.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<StreamError> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Error(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }
}

impl StreamDelegate for EventLog {
    fn on_capture_state_changed(&self, state: &CaptureState) {
        self.events.lock().push(Event::Capture(state.clone()));
    }

    fn on_playback_state_changed(&self, state: PlaybackState) {
        self.events.lock().push(Event::Playback(state));
    }

    fn on_level_updated(&self, level: &VoiceLevel) {
        self.events.lock().push(Event::Level(level.active));
    }

    fn on_error(&self, error: &StreamError) {
        self.events.lock().push(Event::Error(error.clone()));
    }

    fn on_segment_finished(&self, segment: &PlaybackSegment) {
        self.events.lock().push(Event::SegmentFinished(segment.index));
    }

    fn on_capture_finished(&self, summary: &CaptureSummary) {
        self.events.lock().push(Event::CaptureFinished(summary.bytes_sent));
    }
}
