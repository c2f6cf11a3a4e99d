use std::path::Path;

use crate::models::capture::{CaptureSession, CaptureStats};
use crate::models::error::StreamError;
use crate::models::pcm::PcmBlock;
use crate::processing::voice_gate::{self, VoiceLevel};
use crate::processing::wav_format;
use crate::traits::capture_recorder::CaptureSource;

/// Result of one poll of the capture file.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Fewer than `minimum_block_bytes` new bytes; nothing was read.
    Pending,
    /// A silent block was read and discarded.
    Silent(VoiceLevel),
    /// A voiced block ready for the outbound channel.
    Emit(PcmBlock, VoiceLevel),
}

impl TickOutcome {
    /// The block to transmit, if any.
    pub fn into_block(self) -> Option<PcmBlock> {
        match self {
            Self::Emit(block, _) => Some(block),
            _ => None,
        }
    }
}

/// Incremental reader over a growing capture file.
///
/// Tracks how far the file has been consumed so every byte is extracted
/// exactly once, strips the container header from the first region only and
/// applies the voice gate before anything is transmitted.
#[derive(Debug)]
pub struct CaptureCursor {
    session: CaptureSession,
    minimum_block_bytes: u64,
    stats: CaptureStats,
}

impl CaptureCursor {
    pub fn new(session: CaptureSession, minimum_block_bytes: u64) -> Self {
        Self {
            session,
            minimum_block_bytes,
            stats: CaptureStats::default(),
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.session.bytes_consumed
    }

    /// Poll the capture file once.
    ///
    /// Read errors leave the cursor untouched so the next tick retries the
    /// same region. A malformed block is discarded, counted and returned as
    /// `MalformedBlock`; the cursor stops on the last whole sample.
    pub fn poll_tick(&mut self, source: &dyn CaptureSource, uri: &Path) -> Result<TickOutcome, StreamError> {
        self.stats.ticks += 1;

        let file_size = source.current_file_size(uri)?;
        if file_size < self.session.bytes_consumed {
            log::warn!(
                "Capture file shrank to {} bytes (cursor at {})",
                file_size,
                self.session.bytes_consumed
            );
            return Ok(TickOutcome::Pending);
        }

        let delta = file_size - self.session.bytes_consumed;
        if delta < self.minimum_block_bytes {
            return Ok(TickOutcome::Pending);
        }

        let block = self.read_region(source, uri, file_size)?;

        if let Err(e) = block.validate() {
            self.stats.malformed_blocks += 1;
            // Leave a trailing half sample for the next read so later blocks
            // stay aligned to sample boundaries.
            if self.session.bytes_consumed % 2 == 1 {
                self.session.bytes_consumed -= 1;
                self.stats.bytes_read -= 1;
            }
            return Err(e);
        }

        let level = voice_gate::measure(&block);
        if !level.active {
            log::trace!("Dropping silent block ({} bytes, rms {:.1})", block.len(), level.rms);
            self.stats.silent_blocks += 1;
            return Ok(TickOutcome::Silent(level));
        }

        self.stats.blocks_sent += 1;
        self.stats.bytes_sent += block.len() as u64;
        Ok(TickOutcome::Emit(block, level))
    }

    /// Read everything not yet consumed, bypassing the size and voice gates.
    ///
    /// Always yields exactly one block, possibly empty, and then resets the
    /// session so the cursor is ready for a fresh capture file.
    pub fn finish(&mut self, source: &dyn CaptureSource, uri: &Path) -> Result<PcmBlock, StreamError> {
        let result = source
            .current_file_size(uri)
            .and_then(|file_size| {
                if file_size <= self.session.bytes_consumed {
                    return Ok(PcmBlock::default());
                }
                self.read_region(source, uri, file_size)
            });

        self.session.reset();

        let block = result?;
        self.stats.blocks_sent += 1;
        self.stats.bytes_sent += block.len() as u64;
        log::debug!("Final capture flush: {} bytes", block.len());
        Ok(block)
    }

    /// Read `[bytes_consumed, file_size)`, strip the header once and advance.
    fn read_region(&mut self, source: &dyn CaptureSource, uri: &Path, file_size: u64) -> Result<PcmBlock, StreamError> {
        let offset = self.session.bytes_consumed;
        let length = (file_size - offset) as usize;
        let raw = source.read_range(uri, offset, length)?;

        // Never advance past what was actually read.
        let end = offset + raw.len() as u64;
        let pcm = wav_format::unframe(&raw, self.session.container_header_stripped).to_vec();

        self.session.container_header_stripped = true;
        self.session.bytes_consumed = end;
        self.stats.bytes_read += raw.len() as u64;

        Ok(PcmBlock::new(pcm))
    }
}
