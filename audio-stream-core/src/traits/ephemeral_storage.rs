use std::path::PathBuf;

use crate::models::error::StreamError;

/// Process-local, non-durable storage for materialized playback segments.
pub trait EphemeralStorage: Send + Sync {
    /// Store `bytes` under `key`, returning the location a player can load.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StreamError>;

    /// Remove the bytes stored under `key`. Missing keys are not an error.
    fn delete(&self, key: &str) -> Result<(), StreamError>;
}
