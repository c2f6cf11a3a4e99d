use std::path::{Path, PathBuf};

use crate::models::config::StreamConfiguration;
use crate::models::error::StreamError;

/// Platform microphone recorder that writes a growing WAV file.
///
/// The recorder owns the device. The file it writes is read concurrently
/// through a [`CaptureSource`] while recording is in progress.
pub trait CaptureRecorder: Send {
    /// Whether microphone access is currently authorized.
    fn is_authorized(&self) -> Result<bool, StreamError>;

    /// Allocate the capture file and configure the device.
    ///
    /// Returns the location of the file that will grow once recording starts.
    fn prepare(&mut self, config: &StreamConfiguration) -> Result<PathBuf, StreamError>;

    /// Begin writing audio to the prepared file.
    fn start(&mut self) -> Result<(), StreamError>;

    /// Stop recording, finalize the file and return its location.
    fn stop(&mut self) -> Result<PathBuf, StreamError>;
}

/// Random access to the capture file while it grows.
pub trait CaptureSource: Send + Sync {
    /// Current size of the file in bytes.
    fn current_file_size(&self, uri: &Path) -> Result<u64, StreamError>;

    /// Read `length` bytes starting at `offset`.
    ///
    /// May return fewer bytes if the file is shorter than requested.
    fn read_range(&self, uri: &Path, offset: u64, length: usize) -> Result<Vec<u8>, StreamError>;
}
