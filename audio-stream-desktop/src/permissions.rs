//! Microphone availability check.
//!
//! cpal has no portable permission API. Opening the default input device and
//! querying its configuration is the closest check: on macOS the query fails
//! while TCC access is denied, and on Windows and Linux it fails when the
//! privacy toggle or the sound server blocks capture.

use cpal::traits::{DeviceTrait, HostTrait};

use audio_stream_core::models::error::StreamError;

/// Check if microphone access is available.
///
/// Returns `Ok(false)` when no input device exists or its configuration
/// cannot be read.
pub fn check_microphone_permission() -> Result<bool, StreamError> {
    let host = cpal::default_host();

    let Some(device) = host.default_input_device() else {
        log::warn!("No default input device on host {:?}", host.id());
        return Ok(false);
    };

    match device.default_input_config() {
        Ok(_) => Ok(true),
        Err(e) => {
            log::warn!("Input device rejected configuration query: {}", e);
            Ok(false)
        }
    }
}
