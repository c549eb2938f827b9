//! # AIOC Tester
//!
//! One-shot loopback check for an AIOC-style USB radio interface: key the
//! transmitter, play a test tone, unkey, record the receiver and save it.
//!
//! ## Sequence
//!
//! ```text
//!  config.toml ──► Config
//!                    │
//!       ┌────────────┼──────────────────────────┐
//!       ▼            ▼                          ▼
//!  list_devices   ptt::open                generate_tone
//!  find TX (out)  ┌──────────┐                  │
//!  find RX (in)   │ HID GPIO │                  │
//!       │         │ DTR/RTS  │                  │
//!       │         └────┬─────┘                  │
//!       │              │ set(true) + 100 ms     │
//!       ├──────────────┼──────────────► play ◄──┘
//!       │              │ set(false)
//!       └──────────────┼──────────────► record ──► aioc_rx_test.wav
//!                      │ close()
//!                      ▼
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod harness;
pub mod ptt;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    use std::time::Duration;

    /// Config file looked up in the working directory
    pub const DEFAULT_CONFIG_FILE: &str = "aioc_test.toml";

    /// Recording written at the end of every run
    pub const RX_WAV_FILE: &str = "aioc_rx_test.wav";

    /// Tone amplitude relative to full scale
    pub const TONE_AMPLITUDE: f64 = 0.6;

    /// Delay between keying PTT and starting audio
    pub const PTT_KEY_DELAY: Duration = Duration::from_millis(100);

    /// Serial port speed (no data is sent, only line states)
    pub const SERIAL_BAUD_RATE: u32 = 9600;

    /// Settle time after forcing the serial lines idle on open
    pub const SERIAL_OPEN_SETTLE: Duration = Duration::from_millis(100);

    /// Gap between the DTR and RTS writes
    pub const SERIAL_LINE_STAGGER: Duration = Duration::from_millis(20);

    /// HID report ID for the CM108 GPIO output report
    pub const HID_REPORT_ID: u8 = 0x00;

    /// Extra time a blocking play/record call may take past its nominal length
    pub const STREAM_GRACE: Duration = Duration::from_secs(2);

    /// Longest tone or recording accepted, in samples (ten minutes at 48 kHz)
    pub const MAX_STREAM_SAMPLES: f64 = 48_000.0 * 600.0;
}
