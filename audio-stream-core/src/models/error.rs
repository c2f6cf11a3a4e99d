use thiserror::Error;

/// Errors raised by the streaming engine.
///
/// `PermissionDenied`, `CaptureUnavailable`, `InvalidState` and
/// `ConfigurationFailed` are returned from `start()`/`stop()`. The remaining
/// variants describe steady-state failures that are logged and reported to
/// the delegate without interrupting the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("malformed PCM block ({len} bytes)")]
    MalformedBlock { len: usize },

    #[error("storage write failed: {0}")]
    StorageWriteFailure(String),

    #[error("playback failed: {0}")]
    PlaybackFailure(String),

    #[error("capture file read failed: {0}")]
    ReadFailure(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl StreamError {
    /// Whether the error ends the operation that raised it, as opposed to
    /// being absorbed by the streaming loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::CaptureUnavailable(_)
                | Self::InvalidState(_)
                | Self::ConfigurationFailed(_)
        )
    }
}
