//! Configuration management
//!
//! The test is driven by a small TOML file with three sections:
//!
//! ```toml
//! [aioc]
//! tx_device_name = "All-In-One-Cable"
//! rx_device_name = "All-In-One-Cable"
//!
//! [ptt]
//! mode = "hid"            # or "serial"
//! hid_vid = "0x1209"
//! hid_pid = "0x7388"
//! hid_gpio_ptt = "0x04"
//! com_port = "COM7"
//! serial_active_low = false
//! serial_settle_time = 0.05
//!
//! [audio]
//! sample_rate = 48000
//! tx_duration = 3.0
//! rx_record_time = 5.0
//! tx_tone_hz = 1046.5
//! ```
//!
//! Mode-specific `[ptt]` keys are only required for the selected mode.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_CONFIG_FILE, MAX_STREAM_SAMPLES};
use crate::{Error, Result};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Audio endpoint names
    pub aioc: AiocConfig,

    /// Push-to-talk control
    pub ptt: PttConfig,

    /// Tone and recording parameters
    pub audio: AudioConfig,
}

/// Audio endpoint names, matched as case-insensitive substrings
#[derive(Debug, Clone, Deserialize)]
pub struct AiocConfig {
    /// Output device used for the TX tone
    pub tx_device_name: String,

    /// Input device recorded after unkeying
    pub rx_device_name: String,
}

/// `[ptt]` section as written in the file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PttConfig {
    /// `hid` or `serial`
    pub mode: String,

    /// USB vendor ID, hex
    #[serde(default)]
    pub hid_vid: Option<String>,

    /// USB product ID, hex
    #[serde(default)]
    pub hid_pid: Option<String>,

    /// GPIO bitmask driving PTT, hex
    #[serde(default)]
    pub hid_gpio_ptt: Option<String>,

    /// Serial port name (`COM7`, `/dev/ttyACM0`)
    #[serde(default)]
    pub com_port: Option<String>,

    /// DTR/RTS are asserted by pulling them low
    #[serde(default)]
    pub serial_active_low: Option<bool>,

    /// Seconds to wait after writing RTS
    #[serde(default)]
    pub serial_settle_time: Option<f64>,
}

/// Audio configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Sample rate for both playback and recording
    pub sample_rate: u32,

    /// Length of the TX tone in seconds
    pub tx_duration: f64,

    /// Length of the RX recording in seconds
    pub rx_record_time: f64,

    /// TX tone frequency in Hz
    pub tx_tone_hz: f64,
}

/// Supported PTT strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttMode {
    Hid,
    Serial,
}

impl FromStr for PttMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hid" => Ok(PttMode::Hid),
            "serial" => Ok(PttMode::Serial),
            _ => Err(Error::Config(format!(
                "invalid PTT mode \"{}\" (expected \"hid\" or \"serial\")",
                s
            ))),
        }
    }
}

impl fmt::Display for PttMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PttMode::Hid => write!(f, "hid"),
            PttMode::Serial => write!(f, "serial"),
        }
    }
}

/// CM108-style HID GPIO parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidSettings {
    pub vid: u16,
    pub pid: u16,
    pub gpio_mask: u8,
}

/// DTR/RTS parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    pub port: String,
    pub active_low: bool,
    pub settle: Duration,
}

/// Validated `[ptt]` section
#[derive(Debug, Clone, PartialEq)]
pub enum PttSettings {
    Hid(HidSettings),
    Serial(SerialSettings),
}

impl PttSettings {
    pub fn mode(&self) -> PttMode {
        match self {
            PttSettings::Hid(_) => PttMode::Hid,
            PttSettings::Serial(_) => PttMode::Serial,
        }
    }
}

impl PttConfig {
    /// Parse the mode and the keys it needs.
    ///
    /// Touches no hardware, so an invalid section is rejected before any
    /// device is opened.
    pub fn settings(&self) -> Result<PttSettings> {
        match self.mode.parse::<PttMode>()? {
            PttMode::Hid => Ok(PttSettings::Hid(HidSettings {
                vid: parse_hex("hid_vid", required("hid_vid", &self.hid_vid)?)?,
                pid: parse_hex("hid_pid", required("hid_pid", &self.hid_pid)?)?,
                gpio_mask: parse_hex("hid_gpio_ptt", required("hid_gpio_ptt", &self.hid_gpio_ptt)?)?,
            })),
            PttMode::Serial => {
                let port = required("com_port", &self.com_port)?.trim().to_string();
                if port.is_empty() {
                    return Err(Error::Config("ptt.com_port is empty".into()));
                }
                let active_low = required("serial_active_low", &self.serial_active_low)?;
                let settle_s = required("serial_settle_time", &self.serial_settle_time)?;
                let settle = Duration::try_from_secs_f64(settle_s).map_err(|_| {
                    Error::Config(format!(
                        "ptt.serial_settle_time must be a non-negative number of seconds, got {}",
                        settle_s
                    ))
                })?;
                Ok(PttSettings::Serial(SerialSettings {
                    port,
                    active_low,
                    settle,
                }))
            }
        }
    }
}

fn required<T: Clone>(key: &str, value: &Option<T>) -> Result<T> {
    value
        .clone()
        .ok_or_else(|| Error::Config(format!("missing required key ptt.{}", key)))
}

/// Parse a hex string such as `0x1209` or `1209` into an integer.
pub fn parse_hex<T>(key: &str, value: String) -> Result<T>
where
    T: TryFrom<u32>,
{
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u32::from_str_radix(digits, 16)
        .ok()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| Error::Config(format!("ptt.{} is not a valid hex value: \"{}\"", key, value)))
}

fn positive(section: &str, key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{}.{} must be a positive number, got {}",
            section, key, value
        )))
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("audio.sample_rate must be positive".into()));
        }
        self.duration("tx_duration", self.tx_duration)?;
        self.duration("rx_record_time", self.rx_record_time)?;
        positive("audio", "tx_tone_hz", self.tx_tone_hz)?;

        if self.tx_tone_hz >= self.sample_rate as f64 / 2.0 {
            tracing::warn!(
                tone_hz = self.tx_tone_hz,
                sample_rate = self.sample_rate,
                "TX tone is at or above Nyquist and will alias"
            );
        }
        Ok(())
    }

    /// A duration must be positive and fit in [`MAX_STREAM_SAMPLES`] at the
    /// configured rate.
    fn duration(&self, key: &str, seconds: f64) -> Result<()> {
        positive("audio", key, seconds)?;
        if seconds * self.sample_rate as f64 > MAX_STREAM_SAMPLES {
            return Err(Error::Config(format!(
                "audio.{} = {} s is too long at {} Hz (limit {} samples)",
                key, seconds, self.sample_rate, MAX_STREAM_SAMPLES
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Check value ranges and the PTT section
    pub fn validate(&self) -> Result<()> {
        for (key, name) in [
            ("tx_device_name", &self.aioc.tx_device_name),
            ("rx_device_name", &self.aioc.rx_device_name),
        ] {
            if name.trim().is_empty() {
                return Err(Error::Config(format!("aioc.{} is empty", key)));
            }
        }
        self.audio.validate()?;
        self.ptt.settings()?;
        Ok(())
    }

    /// Pick the config file: explicit path, then the working directory,
    /// then the per-user config directory.
    pub fn locate(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Ok(local);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Ok(path),
            _ => Err(Error::Config(format!(
                "{} not found in the working directory or the user config directory",
                DEFAULT_CONFIG_FILE
            ))),
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "aioc-tester", "aioc-tester")
            .map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HID_CONFIG: &str = r#"
        [aioc]
        tx_device_name = "All-In-One-Cable"
        rx_device_name = "All-In-One-Cable"

        [ptt]
        mode = "HID"
        hid_vid = "0x1209"
        hid_pid = "7388"
        hid_gpio_ptt = "0x04"

        [audio]
        sample_rate = 48000
        tx_duration = 3.0
        rx_record_time = 5
        tx_tone_hz = 1000.0
    "#;

    fn with_ptt(ptt: &str) -> String {
        format!(
            r#"
            [aioc]
            tx_device_name = "USB Audio"
            rx_device_name = "USB Audio"

            [ptt]
            {}

            [audio]
            sample_rate = 48000
            tx_duration = 3.0
            rx_record_time = 5.0
            tx_tone_hz = 1000.0
            "#,
            ptt
        )
    }

    #[test]
    fn test_load_hid_config() {
        let config = Config::from_toml(HID_CONFIG).unwrap();
        assert_eq!(config.aioc.tx_device_name, "All-In-One-Cable");
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.rx_record_time, 5.0);

        let settings = config.ptt.settings().unwrap();
        assert_eq!(
            settings,
            PttSettings::Hid(HidSettings {
                vid: 0x1209,
                pid: 0x7388,
                gpio_mask: 0x04,
            })
        );
        assert_eq!(settings.mode(), PttMode::Hid);
    }

    #[test]
    fn test_load_serial_config() {
        let text = with_ptt(
            r#"mode = "serial"
            com_port = "COM7"
            serial_active_low = true
            serial_settle_time = 0.05"#,
        );
        let config = Config::from_toml(&text).unwrap();
        match config.ptt.settings().unwrap() {
            PttSettings::Serial(s) => {
                assert_eq!(s.port, "COM7");
                assert!(s.active_low);
                assert_eq!(s.settle, Duration::from_millis(50));
            }
            other => panic!("expected serial settings, got {:?}", other),
        }
    }

    #[test]
    fn test_bogus_mode_rejected() {
        let ptt = PttConfig {
            mode: "bogus".into(),
            ..Default::default()
        };
        match ptt.settings() {
            Err(Error::Config(msg)) => assert!(msg.contains("bogus")),
            other => panic!("expected config error, got {:?}", other),
        }

        assert!(matches!(
            Config::from_toml(&with_ptt(r#"mode = "bogus""#)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_mode_key_is_config_error() {
        let text = with_ptt(r#"mode = "hid"
            hid_vid = "1209""#);
        match Config::from_toml(&text) {
            Err(Error::Config(msg)) => assert!(msg.contains("hid_pid")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_section_is_config_error() {
        let err = Config::from_toml("[aioc]\ntx_device_name = \"x\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_non_numeric_sample_rate() {
        let text = HID_CONFIG.replace("sample_rate = 48000", "sample_rate = \"fast\"");
        assert!(matches!(Config::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    fn test_non_positive_duration() {
        let text = HID_CONFIG.replace("tx_duration = 3.0", "tx_duration = 0.0");
        match Config::from_toml(&text) {
            Err(Error::Config(msg)) => assert!(msg.contains("tx_duration")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_duration_rejected() {
        let text = HID_CONFIG.replace("tx_duration = 3.0", "tx_duration = 1e300");
        match Config::from_toml(&text) {
            Err(Error::Config(msg)) => assert!(msg.contains("audio.tx_duration")),
            other => panic!("expected config error, got {:?}", other),
        }

        let text = HID_CONFIG.replace("rx_record_time = 5", "rx_record_time = 1e7");
        match Config::from_toml(&text) {
            Err(Error::Config(msg)) => assert!(msg.contains("audio.rx_record_time")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_duration_limit_scales_with_sample_rate() {
        let ten_minutes = HID_CONFIG.replace("tx_duration = 3.0", "tx_duration = 600.0");
        assert!(Config::from_toml(&ten_minutes).is_ok());

        let doubled = ten_minutes.replace("sample_rate = 48000", "sample_rate = 96000");
        assert!(matches!(Config::from_toml(&doubled), Err(Error::Config(_))));
    }

    #[test]
    fn test_negative_settle_time() {
        let text = with_ptt(
            r#"mode = "serial"
            com_port = "COM7"
            serial_active_low = false
            serial_settle_time = -1.0"#,
        );
        assert!(matches!(Config::from_toml(&text), Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex::<u16>("vid", "0x1209".into()).unwrap(), 0x1209);
        assert_eq!(parse_hex::<u16>("vid", "0X1209".into()).unwrap(), 0x1209);
        assert_eq!(parse_hex::<u16>("vid", " 7388 ".into()).unwrap(), 0x7388);
        assert_eq!(parse_hex::<u8>("gpio", "4".into()).unwrap(), 4);
        assert!(parse_hex::<u16>("vid", "zz".into()).is_err());
        assert!(parse_hex::<u8>("gpio", "0x100".into()).is_err());
        assert!(parse_hex::<u16>("vid", "".into()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("aioc-tester-does-not-exist.toml");
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let path = PathBuf::from("custom.toml");
        assert_eq!(Config::locate(Some(path.clone())).unwrap(), path);
    }
}
