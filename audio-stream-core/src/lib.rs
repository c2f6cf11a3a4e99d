//! # audio-stream-core
//!
//! Platform-agnostic core of a full-duplex voice streaming engine.
//!
//! Captures microphone audio into a growing WAV file, polls it incrementally,
//! gates out silence and forwards raw PCM to an outbound channel. Inbound PCM
//! chunks are accumulated into segments, written to ephemeral storage and
//! played back in order without gaps. Platform backends implement
//! `CaptureRecorder` and `SegmentPlayer` and plug into the generic
//! `StreamSession`.
//!
//! ## Architecture
//!
//! ```text
//! audio-stream-core (this crate)
//! ├── traits/       ← CaptureRecorder, CaptureSource, SegmentPlayer, EphemeralStorage, channels, StreamDelegate
//! ├── models/       ← StreamError, states, StreamConfiguration, PcmBlock, PlaybackSegment, summaries
//! ├── processing/   ← WAV framing, voice gate, PCM conversion
//! ├── capture/      ← CaptureCursor (incremental capture-file reader)
//! ├── playback/     ← AccumulationBuffer, SegmentScheduler
//! ├── session/      ← StreamSession (generic orchestrator)
//! └── storage/      ← cache-directory segment storage, capture file access
//! ```

pub mod capture;
pub mod models;
pub mod playback;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use capture::cursor::{CaptureCursor, TickOutcome};
pub use models::capture::{CaptureSession, CaptureStats};
pub use models::config::StreamConfiguration;
pub use models::diagnostics::{PlaybackStats, StreamDiagnostics};
pub use models::error::StreamError;
pub use models::pcm::PcmBlock;
pub use models::segment::PlaybackSegment;
pub use models::state::{CaptureState, PlaybackState, SegmentState};
pub use models::summary::{CaptureSummary, UploadOutcome};
pub use playback::accumulator::AccumulationBuffer;
pub use playback::scheduler::{SegmentScheduler, SEGMENT_THRESHOLD_BYTES};
pub use processing::voice_gate::{VoiceLevel, VOICE_THRESHOLD};
pub use session::stream_session::StreamSession;
pub use storage::cache_dir::CacheDirStorage;
pub use storage::capture_file::FileCaptureSource;
pub use traits::capture_recorder::{CaptureRecorder, CaptureSource};
pub use traits::channels::{OutboundChannel, UploadQueue};
pub use traits::ephemeral_storage::EphemeralStorage;
pub use traits::segment_player::{PlaybackCallback, PlaybackHandle, PlaybackOutcome, SegmentPlayer};
pub use traits::stream_delegate::StreamDelegate;
