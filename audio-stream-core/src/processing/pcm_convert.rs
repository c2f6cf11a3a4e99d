//! Sample conversion between device formats and the 16 kHz mono stream format.
//!
//! Pure math over slices; used by platform backends on both the capture and
//! playback side.

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let frame_count = samples.len() / channels;
    let scale = 1.0 / channels as f32;
    let mut mono = Vec::with_capacity(frame_count);
    for frame in 0..frame_count {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            sum += samples[frame * channels + ch];
        }
        mono.push(sum * scale);
    }
    mono
}

/// Duplicate mono samples across `channels` interleaved channels.
pub fn upmix_from_mono(mono: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return mono.to_vec();
    }
    let mut out = Vec::with_capacity(mono.len() * channels);
    for &sample in mono {
        for _ in 0..channels {
            out.push(sample);
        }
    }
    out
}

/// Linear interpolation resampling for mono audio.
///
/// Returns input unchanged if rates match.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return samples.to_vec();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_count = (samples.len() as f64 * ratio) as usize;
    if output_count == 0 {
        return Vec::new();
    }

    let mut output = vec![0.0f32; output_count];
    for (i, sample) in output.iter_mut().enumerate() {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        if index + 1 < samples.len() {
            *sample = samples[index] * (1.0 - fraction) + samples[index + 1] * fraction;
        } else if index < samples.len() {
            *sample = samples[index];
        }
    }
    output
}

/// Linear resampler for a continuous mono stream delivered in chunks.
///
/// Output sample `k` sits at source position `k * source_rate / target_rate`,
/// computed in integers over the whole stream, so chunk boundaries neither
/// drop samples nor shift the phase. The last input sample of each chunk is
/// kept to interpolate across the seam.
#[derive(Debug, Clone)]
pub struct StreamResampler {
    source_rate: u64,
    target_rate: u64,
    /// Source samples seen before the current chunk.
    consumed: u64,
    /// Index of the next output sample.
    produced: u64,
    previous: Option<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            source_rate: source_rate.max(1) as u64,
            target_rate: target_rate.max(1) as u64,
            consumed: 0,
            produced: 0,
            previous: None,
        }
    }

    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.source_rate == self.target_rate {
            return input.to_vec();
        }
        if input.is_empty() {
            return Vec::new();
        }

        let end = self.consumed + input.len() as u64;
        let capacity = (input.len() as u64 * self.target_rate / self.source_rate) as usize + 1;
        let mut output = Vec::with_capacity(capacity);

        loop {
            let position = self.produced * self.source_rate;
            let index = position / self.target_rate;
            // Both neighbours must be available; the right one may be in the next chunk.
            if index + 1 >= end {
                break;
            }
            let fraction = (position % self.target_rate) as f32 / self.target_rate as f32;
            let left = if index < self.consumed {
                self.previous.unwrap_or(input[0])
            } else {
                input[(index - self.consumed) as usize]
            };
            let right = input[(index + 1 - self.consumed) as usize];
            output.push(left + (right - left) * fraction);
            self.produced += 1;
        }

        self.previous = input.last().copied();
        self.consumed = end;
        output
    }
}

/// Convert f32 samples `[-1.0, 1.0]` to 16-bit PCM (little-endian bytes).
///
/// Clamps out-of-range values. Output length = `samples.len() * 2` bytes.
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let int16_value = (clamped * i16::MAX as f32) as i16;
        data.extend_from_slice(&int16_value.to_le_bytes());
    }
    data
}

/// Convert 16-bit little-endian PCM bytes to f32 samples. A trailing odd byte is ignored.
pub fn pcm16_to_f32(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / i16::MAX as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tone(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * 0.05).sin() * 0.5).collect()
    }

    #[test]
    fn chunked_stream_resampling_matches_whole_buffer() {
        // 10 s at 44.1 kHz delivered in 512-frame callbacks.
        let input = tone(441_000);

        let whole = StreamResampler::new(44_100, 16_000).process(&input);

        let mut chunked_resampler = StreamResampler::new(44_100, 16_000);
        let mut chunked = Vec::new();
        for chunk in input.chunks(512) {
            chunked.extend(chunked_resampler.process(chunk));
        }

        assert_eq!(chunked.len(), whole.len());
        for (a, b) in chunked.iter().zip(&whole) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
        // Only the final sample waits for input that never arrives.
        assert!(chunked.len() >= 159_999 && chunked.len() <= 160_000);
    }

    #[test]
    fn stream_resampler_upsamples_uneven_chunks() {
        let input = tone(4_800);
        let mut resampler = StreamResampler::new(4_800, 16_000);
        let mut out = Vec::new();
        for chunk in input.chunks(7) {
            out.extend(resampler.process(chunk));
        }
        let whole = StreamResampler::new(4_800, 16_000).process(&input);
        assert_eq!(out.len(), whole.len());
        assert!(out.len() >= 15_996 && out.len() <= 16_000);
        assert_abs_diff_eq!(out[0], input[0], epsilon = 1e-6);
    }

    #[test]
    fn stream_resampler_passes_through_matching_rates() {
        let input = tone(100);
        let mut resampler = StreamResampler::new(16_000, 16_000);
        assert_eq!(resampler.process(&input), input);
    }

    #[test]
    fn downmix_stereo_to_mono() {
        let stereo = [0.2, 0.8, 0.4, 0.6];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono.len(), 2);
        assert_abs_diff_eq!(mono[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(mono[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn upmix_duplicates_samples() {
        assert_eq!(upmix_from_mono(&[0.1, 0.2], 2), vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(upmix_from_mono(&[0.1], 1), vec![0.1]);
    }

    #[test]
    fn resample_48k_to_16k_thirds_the_length() {
        let samples = vec![0.25f32; 4800];
        let out = resample(&samples, 48000, 16000);
        assert_eq!(out.len(), 1600);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn resample_same_rate_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn pcm16_conversion_clamps_and_round_trips() {
        let pcm = f32_to_pcm16(&[2.0, -2.0, 0.0]);
        assert_eq!(pcm.len(), 6);
        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), -i16::MAX);

        let back = pcm16_to_f32(&pcm);
        assert_abs_diff_eq!(back[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back[1], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back[2], 0.0, epsilon = 1e-6);
    }
}
