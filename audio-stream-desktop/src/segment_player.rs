//! cpal segment player.
//!
//! Each segment is decoded from its WAV file, converted to the output
//! device's rate and channel layout, and rendered on its own playback thread.
//! Completion is reported through the segment's callback once the last frame
//! has been handed to the device.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;

use audio_stream_core::models::error::StreamError;
use audio_stream_core::processing::pcm_convert;
use audio_stream_core::processing::wav_format::{self, WAV_HEADER_SIZE};
use audio_stream_core::traits::segment_player::{PlaybackCallback, PlaybackHandle, PlaybackOutcome, SegmentPlayer};

/// Extra time allowed past a segment's nominal duration before it counts as stalled.
const STALL_GRACE: Duration = Duration::from_secs(2);

const DONE_POLL: Duration = Duration::from_millis(5);

/// Segment player on the host's default output device.
#[derive(Default)]
pub struct CpalSegmentPlayer {
    next_handle: AtomicU64,
    /// Cancellation flags of segments still rendering.
    active: Arc<Mutex<HashMap<u64, Arc<AtomicBool>>>>,
}

impl CpalSegmentPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SegmentPlayer for CpalSegmentPlayer {
    fn play(&self, path: &Path, on_finished: PlaybackCallback) -> Result<PlaybackHandle, StreamError> {
        let bytes =
            fs::read(path).map_err(|e| StreamError::ReadFailure(format!("read {} failed: {}", path.display(), e)))?;
        let header = wav_format::parse_header(&bytes)?;
        if header.bit_depth != 16 || header.channels != 1 {
            return Err(StreamError::PlaybackFailure(format!(
                "unsupported segment format: {} channels, {} bits",
                header.channels, header.bit_depth
            )));
        }

        let data_end = (WAV_HEADER_SIZE + header.data_size as usize).min(bytes.len());
        let mono = pcm_convert::pcm16_to_f32(&bytes[WAV_HEADER_SIZE..data_end]);

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = Arc::new(AtomicBool::new(false));
        self.active.lock().insert(id, Arc::clone(&cancel));

        let active = Arc::clone(&self.active);
        let sample_rate = header.sample_rate;
        let spawned = thread::Builder::new()
            .name("segment-playback".into())
            .spawn(move || {
                let outcome = match render(&mono, sample_rate, &cancel) {
                    Ok(()) => PlaybackOutcome::Finished,
                    Err(e) => {
                        log::warn!("Segment {} playback failed: {}", id, e);
                        PlaybackOutcome::Failed(e)
                    }
                };
                active.lock().remove(&id);
                on_finished(outcome);
            });

        if let Err(e) = spawned {
            self.active.lock().remove(&id);
            return Err(StreamError::PlaybackFailure(format!("failed to spawn playback thread: {}", e)));
        }

        Ok(PlaybackHandle(id))
    }

    fn unload(&self, handle: PlaybackHandle) {
        if let Some(cancel) = self.active.lock().remove(&handle.0) {
            cancel.store(true, Ordering::SeqCst);
        }
    }
}

/// Play `mono` to completion on the default output device. Blocks the caller.
fn render(mono: &[f32], sample_rate: u32, cancel: &AtomicBool) -> Result<(), StreamError> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| StreamError::PlaybackFailure("no default output device".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| StreamError::PlaybackFailure(format!("no supported output config: {}", e)))?;

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let channels = config.channels as usize;
    let device_rate = config.sample_rate.0;

    let resampled = pcm_convert::resample(mono, sample_rate, device_rate);
    let frames = resampled.len();
    let interleaved = pcm_convert::upmix_from_mono(&resampled, channels);
    let done = Arc::new(AtomicBool::new(false));

    let stream = match sample_format {
        SampleFormat::F32 => build_output::<f32>(&device, &config, interleaved, Arc::clone(&done)),
        SampleFormat::I16 => build_output::<i16>(&device, &config, interleaved, Arc::clone(&done)),
        SampleFormat::U16 => build_output::<u16>(&device, &config, interleaved, Arc::clone(&done)),
        other => Err(StreamError::PlaybackFailure(format!("unsupported sample format {:?}", other))),
    }?;

    stream
        .play()
        .map_err(|e| StreamError::PlaybackFailure(format!("failed to start output stream: {}", e)))?;

    let nominal = Duration::from_secs_f64(frames as f64 / device_rate.max(1) as f64);
    let deadline = Instant::now() + nominal + STALL_GRACE;
    while !done.load(Ordering::SeqCst) {
        if cancel.load(Ordering::SeqCst) {
            log::debug!("Segment unloaded before completion");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(StreamError::PlaybackFailure("output stream stalled".into()));
        }
        thread::sleep(DONE_POLL);
    }

    drop(stream);
    Ok(())
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Vec<f32>,
    done: Arc<AtomicBool>,
) -> Result<Stream, StreamError>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let mut position = 0usize;

    device
        .build_output_stream(
            config,
            move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
                for slot in out.iter_mut() {
                    let value = samples.get(position).copied().unwrap_or(0.0);
                    *slot = T::from_sample(value);
                    position += 1;
                }
                if position >= samples.len() {
                    done.store(true, Ordering::SeqCst);
                }
            },
            |err| log::error!("Output stream error: {}", err),
            None,
        )
        .map_err(|e| StreamError::PlaybackFailure(format!("failed to build output stream: {}", e)))
}
