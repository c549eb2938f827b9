//! Error types
//!
//! Every failure is fatal for the run: errors bubble up to `main` unchanged
//! and are printed at the process boundary.

use crate::audio::device::Direction;

/// Audio subsystem errors
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Device enumeration failed
    #[error("failed to enumerate audio devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    /// The device disappeared between enumeration and use
    #[error("audio device #{0} is no longer available")]
    DeviceGone(usize),

    /// No stream configuration matches the requested rate
    #[error("{device} has no {direction} stream config at {sample_rate} Hz")]
    UnsupportedConfig {
        device: String,
        direction: Direction,
        sample_rate: u32,
    },

    /// Querying supported stream configs failed
    #[error("failed to query stream configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    /// Stream could not be built
    #[error("failed to build stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// Stream could not be started
    #[error("failed to start stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// Error reported from the audio callback thread
    #[error("stream error: {0}")]
    StreamError(String),

    /// Blocking play/record did not finish in time
    #[error("{0} did not complete within {1:?}")]
    Timeout(&'static str, std::time::Duration),
}

/// Crate-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed configuration, including unsupported PTT mode
    #[error("config error: {0}")]
    Config(String),

    /// No audio device matched the name/direction
    #[error("{direction} device '{name}' not found")]
    DeviceNotFound { direction: Direction, name: String },

    /// HID or serial PTT device could not be opened
    #[error("failed to open {device}: {reason}")]
    DeviceOpen { device: String, reason: String },

    /// Writing a PTT control signal failed
    #[error("PTT control failed: {0}")]
    Ptt(String),

    /// PTT controller used after close()
    #[error("PTT controller is closed")]
    PttClosed,

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
