use crate::models::pcm::PcmBlock;

/// Inbound PCM waiting to be framed into a playback segment.
///
/// Blocks keep arrival order and are drained all at once; the buffer is
/// never partially flushed.
#[derive(Debug, Default)]
pub struct AccumulationBuffer {
    blocks: Vec<PcmBlock>,
    byte_len: usize,
    sample_rate: Option<u32>,
}

impl AccumulationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: PcmBlock, sample_rate: u32) {
        self.byte_len += block.len();
        self.sample_rate = Some(sample_rate);
        self.blocks.push(block);
    }

    /// Total bytes buffered.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Sample rate of the buffered audio, if any is buffered.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Concatenate every block in arrival order and clear the buffer.
    pub fn take(&mut self) -> Option<(Vec<u8>, u32)> {
        let sample_rate = self.sample_rate.take()?;
        let mut pcm = Vec::with_capacity(self.byte_len);
        for block in self.blocks.drain(..) {
            pcm.extend_from_slice(block.as_bytes());
        }
        self.byte_len = 0;
        Some((pcm, sample_rate))
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.byte_len = 0;
        self.sample_rate = None;
    }
}
