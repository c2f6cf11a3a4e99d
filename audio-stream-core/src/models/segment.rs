use std::path::PathBuf;

use super::state::SegmentState;

/// A framed, independently playable chunk of inbound audio.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSegment {
    /// Sequence number; strictly increasing per scheduler generation.
    pub index: u64,
    /// Ephemeral storage key derived from `index`.
    pub key: String,
    /// Location of the framed bytes in ephemeral storage.
    pub storage_path: PathBuf,
    pub state: SegmentState,
    /// Length of the PCM payload, excluding the container header.
    pub byte_len: usize,
    pub sample_rate: u32,
}

impl PlaybackSegment {
    /// Storage key for the segment with the given index.
    pub fn key_for(index: u64) -> String {
        format!("segment_{:06}", index)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.byte_len / 2) as f64 / self.sample_rate as f64
    }

    /// Move to the next lifecycle state. Consumed segments stay consumed.
    pub fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_per_index() {
        assert_eq!(PlaybackSegment::key_for(0), "segment_000000");
        assert_ne!(PlaybackSegment::key_for(1), PlaybackSegment::key_for(10));
    }

    #[test]
    fn duration_from_payload() {
        let segment = PlaybackSegment {
            index: 0,
            key: PlaybackSegment::key_for(0),
            storage_path: PathBuf::from("segment_000000.wav"),
            state: SegmentState::Buffered,
            byte_len: 32_000,
            sample_rate: 16_000,
        };
        assert!((segment.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn advance_stops_at_consumed() {
        let mut segment = PlaybackSegment {
            index: 3,
            key: PlaybackSegment::key_for(3),
            storage_path: PathBuf::new(),
            state: SegmentState::Playing,
            byte_len: 2,
            sample_rate: 16_000,
        };
        segment.advance();
        assert_eq!(segment.state, SegmentState::Consumed);
        segment.advance();
        assert_eq!(segment.state, SegmentState::Consumed);
    }
}
