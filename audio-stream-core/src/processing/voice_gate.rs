//! Energy-based voice activity gate.
//!
//! A block is active when the root-mean-square of its signed 16-bit samples
//! exceeds [`VOICE_THRESHOLD`]. The threshold is fixed on the 16-bit scale.

use crate::models::pcm::PcmBlock;

/// RMS level above which a block counts as speech.
pub const VOICE_THRESHOLD: f64 = 1000.0;

/// Loudness measurement for one block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoiceLevel {
    pub rms: f64,
    /// Largest absolute sample value.
    pub peak: u16,
    pub active: bool,
}

/// Root-mean-square of the block's samples. Zero for blocks shorter than one sample.
pub fn rms(pcm: &PcmBlock) -> f64 {
    let count = pcm.sample_count();
    if count == 0 {
        return 0.0;
    }
    let sum_sq: f64 = pcm
        .samples()
        .map(|s| {
            let s = s as f64;
            s * s
        })
        .sum();
    (sum_sq / count as f64).sqrt()
}

/// Whether the block carries speech-level energy.
pub fn is_active(pcm: &PcmBlock) -> bool {
    rms(pcm) > VOICE_THRESHOLD
}

/// RMS, peak and activity in one pass over the block.
pub fn measure(pcm: &PcmBlock) -> VoiceLevel {
    let count = pcm.sample_count();
    if count == 0 {
        return VoiceLevel::default();
    }
    let mut sum_sq = 0.0f64;
    let mut peak = 0u16;
    for sample in pcm.samples() {
        let value = sample as f64;
        sum_sq += value * value;
        peak = peak.max(sample.unsigned_abs());
    }
    let rms = (sum_sq / count as f64).sqrt();
    VoiceLevel {
        rms,
        peak,
        active: rms > VOICE_THRESHOLD,
    }
}
