//! cpal microphone recorder.
//!
//! Captures from an input device and appends 16 kHz mono 16-bit PCM to a WAV
//! file that grows while recording. The header carries a zero data size until
//! `stop` patches the real sizes in.

use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use uuid::Uuid;

use audio_stream_core::models::config::StreamConfiguration;
use audio_stream_core::models::error::StreamError;
use audio_stream_core::processing::pcm_convert::{self, StreamResampler};
use audio_stream_core::processing::wav_format::{self, BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE_HZ, WAV_HEADER_SIZE};
use audio_stream_core::traits::capture_recorder::CaptureRecorder;

use crate::permissions;

/// Append-only writer for the growing capture file.
struct CaptureWriter {
    file: File,
    data_bytes: u64,
}

impl CaptureWriter {
    fn create(path: &Path) -> Result<Self, StreamError> {
        let mut file = File::create(path)
            .map_err(|e| StreamError::StorageWriteFailure(format!("create {} failed: {}", path.display(), e)))?;
        let header = wav_format::generate_wav_header(SAMPLE_RATE_HZ, BITS_PER_SAMPLE, CHANNELS, 0);
        file.write_all(&header)
            .map_err(|e| StreamError::StorageWriteFailure(format!("header write failed: {}", e)))?;
        Ok(Self { file, data_bytes: 0 })
    }

    fn append(&mut self, pcm: &[u8]) -> std::io::Result<()> {
        self.file.write_all(pcm)?;
        self.data_bytes += pcm.len() as u64;
        Ok(())
    }

    /// Patch the RIFF and data sizes now that the length is known.
    fn finalize(mut self) -> Result<(), StreamError> {
        let mut header = wav_format::generate_wav_header(SAMPLE_RATE_HZ, BITS_PER_SAMPLE, CHANNELS, 0);
        wav_format::patch_data_size(&mut header, self.data_bytes);
        wav_format::patch_file_size(&mut header, self.data_bytes + WAV_HEADER_SIZE as u64);

        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.write_all(&header))
            .and_then(|_| self.file.sync_all())
            .map_err(|e| StreamError::StorageWriteFailure(format!("header patch failed: {}", e)))
    }
}

type SharedWriter = Arc<Mutex<Option<CaptureWriter>>>;

/// Thread that owns the cpal input stream until told to stop.
struct StreamWorker {
    stop_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Microphone recorder built on cpal.
///
/// `cpal::Stream` is not `Send` on every host, so the stream lives on a
/// dedicated thread and the recorder only keeps a stop channel to it.
pub struct CpalMicRecorder {
    device_name: Option<String>,
    file_path: Option<PathBuf>,
    writer: SharedWriter,
    worker: Option<StreamWorker>,
}

impl CpalMicRecorder {
    /// Record from the host's default input device.
    pub fn default_device() -> Self {
        Self {
            device_name: None,
            file_path: None,
            writer: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    /// Record from the input device with the given name.
    pub fn with_device(name: String) -> Self {
        Self {
            device_name: Some(name),
            file_path: None,
            writer: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    /// Names of all input devices on the default host.
    pub fn list_devices() -> Result<Vec<String>, StreamError> {
        let devices = cpal::default_host()
            .input_devices()
            .map_err(|e| StreamError::CaptureUnavailable(format!("failed to enumerate inputs: {}", e)))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

impl CaptureRecorder for CpalMicRecorder {
    fn is_authorized(&self) -> Result<bool, StreamError> {
        permissions::check_microphone_permission()
    }

    fn prepare(&mut self, config: &StreamConfiguration) -> Result<PathBuf, StreamError> {
        if self.worker.is_some() {
            return Err(StreamError::InvalidState("recorder already running".into()));
        }

        fs::create_dir_all(&config.capture_directory).map_err(|e| {
            StreamError::StorageWriteFailure(format!(
                "failed to create {}: {}",
                config.capture_directory.display(),
                e
            ))
        })?;

        let path = config.capture_directory.join(format!("capture-{}.wav", Uuid::new_v4()));
        *self.writer.lock() = Some(CaptureWriter::create(&path)?);
        self.file_path = Some(path.clone());
        Ok(path)
    }

    fn start(&mut self) -> Result<(), StreamError> {
        if self.worker.is_some() {
            return Err(StreamError::InvalidState("recorder already running".into()));
        }
        if self.writer.lock().is_none() {
            return Err(StreamError::InvalidState("recorder not prepared".into()));
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let device_name = self.device_name.clone();
        let writer = Arc::clone(&self.writer);

        let handle = thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let stream = match open_input_stream(device_name.as_deref(), writer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(StreamError::CaptureUnavailable(format!(
                        "failed to start input stream: {}",
                        e
                    ))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Returns on an explicit stop or when the recorder is dropped.
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| StreamError::CaptureUnavailable(format!("failed to spawn mic thread: {}", e)))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(StreamError::CaptureUnavailable("mic thread exited early".into())));
        if let Err(e) = ready {
            let _ = handle.join();
            return Err(e);
        }

        log::info!("Microphone recording started");
        self.worker = Some(StreamWorker { stop_tx, handle });
        Ok(())
    }

    fn stop(&mut self) -> Result<PathBuf, StreamError> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            if worker.handle.join().is_err() {
                log::error!("Mic capture thread panicked");
            }
        }

        if let Some(writer) = self.writer.lock().take() {
            log::info!("Microphone recording stopped ({} PCM bytes)", writer.data_bytes);
            writer.finalize()?;
        }

        self.file_path
            .take()
            .ok_or_else(|| StreamError::InvalidState("recorder not prepared".into()))
    }
}

impl Drop for CpalMicRecorder {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("Failed to stop recorder on drop: {}", e);
            }
        }
    }
}

fn find_input_device(name: Option<&str>) -> Result<cpal::Device, StreamError> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or_else(|| StreamError::CaptureUnavailable("no default input device".into())),
        Some(name) => host
            .input_devices()
            .map_err(|e| StreamError::CaptureUnavailable(format!("failed to enumerate inputs: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| StreamError::CaptureUnavailable(format!("input device '{}' not found", name))),
    }
}

fn open_input_stream(device_name: Option<&str>, writer: SharedWriter) -> Result<Stream, StreamError> {
    let device = find_input_device(device_name)?;
    let supported = device
        .default_input_config()
        .map_err(|e| StreamError::CaptureUnavailable(format!("no supported input config: {}", e)))?;

    log::info!(
        "Input device {:?}: {} Hz, {} channels, {:?}",
        device.name(),
        supported.sample_rate().0,
        supported.channels(),
        supported.sample_format()
    );

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    match sample_format {
        SampleFormat::F32 => build_input::<f32>(&device, &config, writer),
        SampleFormat::I16 => build_input::<i16>(&device, &config, writer),
        SampleFormat::U16 => build_input::<u16>(&device, &config, writer),
        other => Err(StreamError::CaptureUnavailable(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }
}

fn build_input<T>(device: &cpal::Device, config: &StreamConfig, writer: SharedWriter) -> Result<Stream, StreamError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let mut resampler = StreamResampler::new(config.sample_rate.0, SAMPLE_RATE_HZ);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
                let mono = pcm_convert::downmix_to_mono(&samples, channels);
                let resampled = resampler.process(&mono);
                let pcm = pcm_convert::f32_to_pcm16(&resampled);

                if let Some(ref mut w) = *writer.lock() {
                    if let Err(e) = w.append(&pcm) {
                        log::error!("Failed to append capture audio: {}", e);
                    }
                }
            },
            |err| log::error!("Input stream error: {}", err),
            None,
        )
        .map_err(|e| StreamError::CaptureUnavailable(format!("failed to build input stream: {}", e)))
}
