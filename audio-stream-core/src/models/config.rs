use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::StreamError;
use crate::processing::wav_format::{BYTES_PER_SAMPLE, SAMPLE_RATE_HZ};

/// Configuration for a streaming session.
///
/// The audio format itself is fixed (16 kHz, mono, 16-bit PCM); only timing
/// and storage locations are configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfiguration {
    /// Interval between capture-file polls in milliseconds (default: 250).
    pub poll_interval_ms: u64,

    /// Minimum amount of new audio, in milliseconds, before a block is
    /// extracted during capture (default: 500).
    pub minimum_block_ms: u64,

    /// Directory where the growing capture file is written.
    pub capture_directory: PathBuf,

    /// Directory under which playback segments are materialized.
    pub cache_directory: PathBuf,
}

impl StreamConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll interval must be positive".into());
        }
        if self.minimum_block_ms == 0 {
            return Err("minimum block duration must be positive".into());
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Bytes of new capture data required before a block is extracted.
    ///
    /// `sample_rate * 2 * minimum_block_ms / 1000`, i.e. 16000 bytes for the
    /// default 500 ms.
    pub fn minimum_block_bytes(&self) -> u64 {
        SAMPLE_RATE_HZ as u64 * BYTES_PER_SAMPLE as u64 * self.minimum_block_ms / 1000
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, StreamError> {
        let json = fs::read_to_string(path).map_err(|e| {
            StreamError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            StreamError::ConfigurationFailed(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate().map_err(StreamError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for StreamConfiguration {
    fn default() -> Self {
        let temp = std::env::temp_dir();
        Self {
            poll_interval_ms: 250,
            minimum_block_ms: 500,
            capture_directory: temp.join("audio-stream").join("capture"),
            cache_directory: temp.join("audio-stream").join("segments"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_minimum_block_is_half_a_second() {
        let config = StreamConfiguration::default();
        assert_eq!(config.minimum_block_bytes(), 16_000);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_intervals() {
        let config = StreamConfiguration {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StreamConfiguration {
            minimum_block_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_json_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "poll_interval_ms": 100, "cache_directory": "/tmp/segs" }}"#).unwrap();

        let config = StreamConfiguration::from_json_file(file.path()).unwrap();
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.minimum_block_ms, 500);
        assert_eq!(config.cache_directory, PathBuf::from("/tmp/segs"));
    }

    #[test]
    fn invalid_json_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = StreamConfiguration::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, StreamError::ConfigurationFailed(_)));
    }
}
