//! WAV container framing.
//!
//! Generates standard 44-byte RIFF WAV headers, wraps raw PCM into playable
//! buffers and strips the header from the first region read out of a growing
//! capture file.

use crate::models::error::StreamError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Fixed stream format: 16 kHz, mono, 16-bit linear PCM.
pub const SAMPLE_RATE_HZ: u32 = 16_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const BYTES_PER_SAMPLE: usize = 2;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let chunk_size = 36u32.wrapping_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Wrap mono 16-bit PCM in a WAV container so it can be played standalone.
pub fn frame(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let header = generate_wav_header(sample_rate, BITS_PER_SAMPLE, CHANNELS, pcm.len() as u32);
    let mut framed = Vec::with_capacity(WAV_HEADER_SIZE + pcm.len());
    framed.extend_from_slice(&header);
    framed.extend_from_slice(pcm);
    framed
}

/// Strip the container header from a region of a capture file.
///
/// The header only exists at the very start of the file, so it is removed
/// when `already_stripped` is false and the region is longer than the header.
/// The header bytes are not validated.
pub fn unframe(buf: &[u8], already_stripped: bool) -> &[u8] {
    if already_stripped || buf.len() <= WAV_HEADER_SIZE {
        return buf;
    }
    &buf[WAV_HEADER_SIZE..]
}

/// Patch the file-size field at offset 4 (RIFF chunk size = file_size - 8).
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = total_file_size.saturating_sub(8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Patch the data-size field at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    let data_size_u32 = data_size as u32;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
}

/// Fields read back from a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub data_size: u32,
}

/// Strictly parse a canonical 44-byte PCM header.
pub fn parse_header(buf: &[u8]) -> Result<WavHeader, StreamError> {
    if buf.len() < WAV_HEADER_SIZE {
        return Err(StreamError::MalformedBlock { len: buf.len() });
    }
    if &buf[0..4] != b"RIFF" || &buf[8..12] != b"WAVE" || &buf[12..16] != b"fmt " || &buf[36..40] != b"data" {
        return Err(StreamError::MalformedBlock { len: buf.len() });
    }
    let format = u16::from_le_bytes([buf[20], buf[21]]);
    if format != 1 {
        return Err(StreamError::MalformedBlock { len: buf.len() });
    }
    Ok(WavHeader {
        channels: u16::from_le_bytes([buf[22], buf[23]]),
        sample_rate: u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]),
        bit_depth: u16::from_le_bytes([buf[34], buf[35]]),
        data_size: u32::from_le_bytes([buf[40], buf[41], buf[42], buf[43]]),
    })
}
