use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of handing a finished capture file to the upload queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum UploadOutcome {
    Queued,
    Uploaded,
    Rejected(String),
}

/// Summary returned when a capture session stops.
///
/// Serializable so the caller can forward it alongside the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Bytes read from the capture file, container header included.
    pub bytes_read: u64,
    /// Bytes handed to the outbound channel, final flush included.
    pub bytes_sent: u64,
    pub blocks_sent: u64,
    pub silent_blocks: u64,
    pub final_flush_bytes: u64,
    /// SHA-256 hex digest of the capture file before deletion.
    pub checksum: Option<String>,
    pub upload: Option<UploadOutcome>,
}

impl CaptureSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
