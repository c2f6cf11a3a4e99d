use super::capture::CaptureStats;

/// Counters kept by the playback scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub chunks_received: u64,
    pub malformed_chunks: u64,
    pub segments_created: u64,
    pub segments_played: u64,
    pub storage_failures: u64,
    pub playback_failures: u64,
}

/// Diagnostics snapshot for debugging a streaming session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDiagnostics {
    pub capture: CaptureStats,
    pub playback: PlaybackStats,
    /// Segments waiting behind the one currently playing.
    pub queued_segments: usize,
    /// Bytes sitting in the accumulation buffer.
    pub buffered_bytes: usize,
}
