/// Capture side state machine.
///
/// State transitions:
/// ```text
/// idle → capturing → stopping → idle
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Capturing { duration_secs: f64 },
    Stopping,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }
}

/// Playback side state machine, independent of capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Active,
}

/// Lifecycle of a single playback segment.
///
/// ```text
/// buffered → queued → playing → consumed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentState {
    Buffered,
    Queued,
    Playing,
    Consumed,
}

impl SegmentState {
    /// The state that follows this one, or `None` once consumed.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Buffered => Some(Self::Queued),
            Self::Queued => Some(Self::Playing),
            Self::Playing => Some(Self::Consumed),
            Self::Consumed => None,
        }
    }
}
