//! Audio backend seam
//!
//! The harness talks to the sound system through [`AudioBackend`] so the
//! whole sequence can be exercised without hardware.

use crate::audio::capture::record_blocking;
use crate::audio::device::{get_device_by_index, list_devices, AudioDevice};
use crate::audio::playback::play_blocking;
use crate::Result;

/// Blocking device enumeration, playback and capture
pub trait AudioBackend {
    /// Devices in enumeration order
    fn devices(&mut self) -> Result<Vec<AudioDevice>>;

    /// Play mono `samples`, returning once playback finished
    fn play(&mut self, device: &AudioDevice, samples: &[f32], sample_rate: u32) -> Result<()>;

    /// Record exactly `frames` mono samples
    fn record(&mut self, device: &AudioDevice, frames: usize, sample_rate: u32) -> Result<Vec<f32>>;
}

/// cpal default host (WASAPI, CoreAudio or ALSA)
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::debug!(host = ?host.id(), "Using audio host");
        Self { host }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn devices(&mut self) -> Result<Vec<AudioDevice>> {
        let devices = list_devices(&self.host)?;
        for device in &devices {
            tracing::debug!(
                index = device.index,
                name = %device.name,
                inputs = device.max_input_channels,
                outputs = device.max_output_channels,
                "Audio device"
            );
        }
        Ok(devices)
    }

    fn play(&mut self, device: &AudioDevice, samples: &[f32], sample_rate: u32) -> Result<()> {
        let handle = get_device_by_index(&self.host, device)?;
        play_blocking(&handle, samples, sample_rate)?;
        Ok(())
    }

    fn record(&mut self, device: &AudioDevice, frames: usize, sample_rate: u32) -> Result<Vec<f32>> {
        let handle = get_device_by_index(&self.host, device)?;
        let samples = record_blocking(&handle, frames, sample_rate)?;
        Ok(samples)
    }
}
