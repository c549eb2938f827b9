//! Audio device enumeration and lookup
//!
//! Devices are addressed by their position in the host's enumeration order.
//! The AIOC shows up under the same name for both directions, so lookups also
//! check that the candidate has channels in the direction being asked for.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SampleRate, SupportedStreamConfig, SupportedStreamConfigRange};
use std::fmt;

use crate::error::AudioError;
use crate::{Error, Result};

/// Stream direction a device must support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Playback (output channels > 0)
    Out,
    /// Capture (input channels > 0)
    In,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => write!(f, "out"),
            Direction::In => write!(f, "in"),
        }
    }
}

/// An enumerated audio device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Position in host enumeration order
    pub index: usize,

    /// Display name
    pub name: String,

    /// Largest input channel count over all supported configs
    pub max_input_channels: u16,

    /// Largest output channel count over all supported configs
    pub max_output_channels: u16,
}

impl AudioDevice {
    /// Channel count available in `direction`
    pub fn channels(&self, direction: Direction) -> u16 {
        match direction {
            Direction::Out => self.max_output_channels,
            Direction::In => self.max_input_channels,
        }
    }

    /// Case-insensitive substring match on the display name
    pub fn matches(&self, name: &str, direction: Direction) -> bool {
        self.name.to_lowercase().contains(&name.to_lowercase()) && self.channels(direction) > 0
    }
}

/// List every device of `host` in enumeration order
pub fn list_devices(host: &cpal::Host) -> std::result::Result<Vec<AudioDevice>, AudioError> {
    let devices = host
        .devices()?
        .enumerate()
        .map(|(index, device)| {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("<unnamed device {}>", index));
            let max_input_channels = device
                .supported_input_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);
            let max_output_channels = device
                .supported_output_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);

            AudioDevice {
                index,
                name,
                max_input_channels,
                max_output_channels,
            }
        })
        .collect();

    Ok(devices)
}

/// Return the first device whose name contains `name` and which has
/// channels in `direction`.
///
/// Ties are broken by enumeration order only.
pub fn find_device<'a>(
    devices: &'a [AudioDevice],
    name: &str,
    direction: Direction,
) -> Result<&'a AudioDevice> {
    devices
        .iter()
        .find(|d| d.matches(name, direction))
        .ok_or_else(|| {
            tracing::warn!(
                direction = %direction,
                name = %name,
                available = ?devices.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
                "No matching audio device"
            );
            Error::DeviceNotFound {
                direction,
                name: name.to_string(),
            }
        })
}

/// Re-open an enumerated device by index, checking it is still the same one
pub fn get_device_by_index(
    host: &cpal::Host,
    device: &AudioDevice,
) -> std::result::Result<cpal::Device, AudioError> {
    let found = host
        .devices()?
        .nth(device.index)
        .ok_or(AudioError::DeviceGone(device.index))?;

    match found.name() {
        Ok(name) if name == device.name => Ok(found),
        _ => Err(AudioError::DeviceGone(device.index)),
    }
}

fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::F32 => Some(0),
        SampleFormat::I16 => Some(1),
        _ => None,
    }
}

/// Pick a stream config running at `sample_rate`.
///
/// Prefers f32 over i16 and the fewest channels; other sample formats are
/// skipped.
pub fn choose_config(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    sample_rate: u32,
) -> Option<SupportedStreamConfig> {
    ranges
        .into_iter()
        .filter(|r| r.min_sample_rate().0 <= sample_rate && sample_rate <= r.max_sample_rate().0)
        .filter_map(|r| format_rank(r.sample_format()).map(|rank| (rank, r)))
        .min_by_key(|(rank, r)| (*rank, r.channels()))
        .map(|(_, r)| r.with_sample_rate(SampleRate(sample_rate)))
}

/// Find a config for `device` in `direction` at `sample_rate`
pub fn stream_config(
    device: &cpal::Device,
    direction: Direction,
    sample_rate: u32,
) -> std::result::Result<SupportedStreamConfig, AudioError> {
    let chosen = match direction {
        Direction::Out => choose_config(device.supported_output_configs()?, sample_rate),
        Direction::In => choose_config(device.supported_input_configs()?, sample_rate),
    };

    chosen.ok_or_else(|| AudioError::UnsupportedConfig {
        device: device.name().unwrap_or_default(),
        direction,
        sample_rate,
    })
}
