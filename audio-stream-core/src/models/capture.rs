use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Mutable bookkeeping for one active capture.
///
/// Owned by the session lifecycle and mutated only by the capture cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Exclusive upper bound of bytes already extracted from the capture file.
    pub bytes_consumed: u64,
    /// Set after the first read; the container header is skipped only once.
    pub container_header_stripped: bool,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            bytes_consumed: 0,
            container_header_stripped: false,
        }
    }

    /// Reset the read position so the next capture starts from a fresh file.
    pub fn reset(&mut self) {
        self.bytes_consumed = 0;
        self.container_header_stripped = false;
    }

    pub fn elapsed_secs(&self) -> f64 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds().max(0) as f64 / 1000.0
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters kept by the capture cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub ticks: u64,
    pub blocks_sent: u64,
    pub silent_blocks: u64,
    pub malformed_blocks: u64,
    /// Bytes handed to the outbound channel, final flush included.
    pub bytes_sent: u64,
    /// Bytes read from the capture file, container header included.
    pub bytes_read: u64,
}
