//! Audio subsystem module
//!
//! Device lookup, test tone, blocking play/record and WAV output.

pub mod backend;
pub mod capture;
pub mod device;
pub mod level;
pub mod playback;
pub mod tone;
pub mod wav;

pub use backend::{AudioBackend, CpalBackend};
pub use device::{find_device, list_devices, AudioDevice, Direction};
pub use level::LevelStats;
pub use tone::generate_tone;
pub use wav::write_wav;

/// Number of mono samples covering `duration_s` at `sample_rate`.
pub fn sample_count(duration_s: f64, sample_rate: u32) -> usize {
    (sample_rate as f64 * duration_s).round() as usize
}
