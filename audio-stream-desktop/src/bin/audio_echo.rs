//! Local echo demo: captures the microphone, forwards voiced blocks straight
//! back into the playback side and prints a summary when done.
//!
//! Usage: `audio-echo [seconds] [config.json]`

use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use audio_stream_core::processing::wav_format::SAMPLE_RATE_HZ;
use audio_stream_core::{
    CaptureState, CaptureSummary, OutboundChannel, PlaybackSegment, PlaybackState, SegmentScheduler,
    StreamConfiguration, StreamDelegate, StreamError, StreamSession, VoiceLevel,
};
use audio_stream_desktop::{CpalMicRecorder, CpalSegmentPlayer};

const DEFAULT_SECONDS: u64 = 10;

/// Outbound channel that loops captured audio back into local playback.
#[derive(Default)]
struct LoopbackChannel {
    scheduler: OnceLock<SegmentScheduler>,
}

impl OutboundChannel for LoopbackChannel {
    fn send(&self, pcm: &[u8]) {
        if let Some(scheduler) = self.scheduler.get() {
            scheduler.ingest(pcm, SAMPLE_RATE_HZ);
        }
    }
}

struct LogDelegate;

impl StreamDelegate for LogDelegate {
    fn on_capture_state_changed(&self, state: &CaptureState) {
        log::info!("Capture: {:?}", state);
    }

    fn on_playback_state_changed(&self, state: PlaybackState) {
        log::info!("Playback: {:?}", state);
    }

    fn on_level_updated(&self, level: &VoiceLevel) {
        log::debug!("Level: rms {:.0}, peak {}, voiced {}", level.rms, level.peak, level.active);
    }

    fn on_error(&self, error: &StreamError) {
        log::warn!("Stream error: {}", error);
    }

    fn on_segment_finished(&self, segment: &PlaybackSegment) {
        log::debug!("Played {} ({:.2}s)", segment.key, segment.duration_secs());
    }

    fn on_capture_finished(&self, _summary: &CaptureSummary) {}
}

fn run(seconds: u64, config: StreamConfiguration) -> Result<(), StreamError> {
    let outbound = Arc::new(LoopbackChannel::default());
    let mut session = StreamSession::new(
        CpalMicRecorder::default_device(),
        Arc::new(CpalSegmentPlayer::new()),
        outbound.clone(),
        config,
    )?;
    session.set_delegate(Arc::new(LogDelegate));
    let _ = outbound.scheduler.set(session.scheduler().clone());

    session.start()?;
    log::info!("Echoing microphone for {} seconds", seconds);
    thread::sleep(Duration::from_secs(seconds));

    if let Some(summary) = session.stop()? {
        match summary.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize summary: {}", e),
        }
    }

    // Let the tail of the echo finish before tearing playback down.
    while session.playback_state() == PlaybackState::Active {
        thread::sleep(Duration::from_millis(50));
    }
    session.cleanup();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seconds = match args.next().map(|s| s.parse::<u64>()) {
        None => DEFAULT_SECONDS,
        Some(Ok(seconds)) => seconds,
        Some(Err(e)) => {
            eprintln!("invalid duration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match args.next() {
        Some(path) => match StreamConfiguration::from_json_file(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => StreamConfiguration::default(),
    };

    match run(seconds, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
