use super::error::StreamError;
use crate::processing::wav_format::BYTES_PER_SAMPLE;

/// A block of raw 16-bit little-endian mono PCM at 16 kHz.
///
/// Blocks are transient: produced by the capture cursor or the inbound
/// channel and consumed by the next stage immediately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmBlock {
    bytes: Vec<u8>,
}

impl PcmBlock {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of whole samples in the block.
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / BYTES_PER_SAMPLE
    }

    /// Iterate the block as signed 16-bit samples. A trailing odd byte is ignored.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.bytes
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Rejects empty blocks and blocks that end in half a sample.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.bytes.is_empty() || self.bytes.len() % BYTES_PER_SAMPLE != 0 {
            return Err(StreamError::MalformedBlock {
                len: self.bytes.len(),
            });
        }
        Ok(())
    }

    /// Build a block from signed samples.
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        Self { bytes }
    }
}

impl From<Vec<u8>> for PcmBlock {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for PcmBlock {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
