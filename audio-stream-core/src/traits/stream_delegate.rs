use crate::models::error::StreamError;
use crate::models::segment::PlaybackSegment;
use crate::models::state::{CaptureState, PlaybackState};
use crate::models::summary::CaptureSummary;
use crate::processing::voice_gate::VoiceLevel;

/// Event delegate for streaming session notifications.
///
/// Capture events arrive on the polling thread, playback events on whichever
/// thread the player signals completion from. Implementations should
/// marshal to the UI thread if needed.
pub trait StreamDelegate: Send + Sync {
    /// Called when the capture side changes state.
    fn on_capture_state_changed(&self, state: &CaptureState);

    /// Called when the playback side starts or drains.
    fn on_playback_state_changed(&self, state: PlaybackState);

    /// Called with the level of every block extracted from the capture file.
    fn on_level_updated(&self, level: &VoiceLevel);

    /// Called for failures absorbed by the streaming loops.
    fn on_error(&self, error: &StreamError);

    /// Called after a segment has been played and its storage released.
    fn on_segment_finished(&self, segment: &PlaybackSegment);

    /// Called when capture stops and the final flush has been sent.
    fn on_capture_finished(&self, summary: &CaptureSummary);
}
