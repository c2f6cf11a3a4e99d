//! # audio-stream-desktop
//!
//! Desktop cpal backend for audio-stream-core.
//!
//! Provides:
//! - `CpalMicRecorder`: microphone capture into a growing 16 kHz mono WAV file
//! - `CpalSegmentPlayer`: playback of framed segments on the default output device
//! - `permissions`: default input device check
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use audio_stream_core::{StreamConfiguration, StreamSession};
//! use audio_stream_desktop::{CpalMicRecorder, CpalSegmentPlayer};
//!
//! let mut session = StreamSession::new(
//!     CpalMicRecorder::default_device(),
//!     Arc::new(CpalSegmentPlayer::new()),
//!     outbound,
//!     StreamConfiguration::default(),
//! )?;
//! session.start()?;
//! ```

pub mod mic_recorder;
pub mod permissions;
pub mod segment_player;

pub use mic_recorder::CpalMicRecorder;
pub use segment_player::CpalSegmentPlayer;
