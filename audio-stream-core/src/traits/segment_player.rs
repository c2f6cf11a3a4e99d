use std::path::Path;
use std::sync::Arc;

use crate::models::error::StreamError;

/// Opaque handle to a loaded segment, returned by [`SegmentPlayer::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

/// How a segment's playback ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackOutcome {
    Finished,
    Failed(StreamError),
}

/// Callback invoked exactly once when a segment stops playing.
///
/// May fire on any thread, including synchronously from inside `play`.
pub type PlaybackCallback = Arc<dyn Fn(PlaybackOutcome) + Send + Sync + 'static>;

/// Platform playback primitive.
pub trait SegmentPlayer: Send + Sync {
    /// Load the framed segment at `path` and start playing it.
    fn play(&self, path: &Path, on_finished: PlaybackCallback) -> Result<PlaybackHandle, StreamError>;

    /// Release resources held for a segment. Unloading a handle that already
    /// finished is a no-op.
    fn unload(&self, handle: PlaybackHandle);
}
