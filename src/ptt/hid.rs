//! CM108-style HID GPIO push-to-talk
//!
//! The AIOC firmware emulates the CM108 GPIO output report:
//!
//! ```text
//! [report id = 0x00] [GPIO mask] [GPIO value]
//! ```
//!
//! The mask selects the GPIO line(s) wired to PTT and the value drives them
//! high (keyed) or low.

use crate::config::HidSettings;
use crate::constants::HID_REPORT_ID;
use crate::ptt::{Ptt, PttState};
use crate::{Error, Result};

/// Sink for HID output reports
pub trait ReportWriter: Send {
    fn write_report(&mut self, report: &[u8]) -> Result<()>;
}

impl ReportWriter for hidapi::HidDevice {
    fn write_report(&mut self, report: &[u8]) -> Result<()> {
        let written = self.write(report).map_err(|e| Error::Ptt(e.to_string()))?;
        if written < report.len() {
            return Err(Error::Ptt(format!(
                "short HID write: {} of {} bytes",
                written,
                report.len()
            )));
        }
        Ok(())
    }
}

/// Build the GPIO output report
pub fn gpio_report(mask: u8, on: bool) -> [u8; 3] {
    [HID_REPORT_ID, mask, if on { mask } else { 0x00 }]
}

/// HID report based PTT
pub struct HidPtt<W: ReportWriter = hidapi::HidDevice> {
    device: Option<W>,
    mask: u8,
    label: String,
    state: PttState,
}

impl HidPtt {
    /// Open the HID device with the configured VID/PID
    pub fn open(settings: &HidSettings) -> Result<Self> {
        let label = format!("HID device {:04x}:{:04x}", settings.vid, settings.pid);
        tracing::debug!(device = %label, gpio_mask = settings.gpio_mask, "Opening HID PTT");

        let open_error = |e: hidapi::HidError| {
            tracing::error!(device = %label, error = %e, "Failed to open HID device");
            Error::DeviceOpen {
                device: label.clone(),
                reason: e.to_string(),
            }
        };

        let api = hidapi::HidApi::new().map_err(open_error)?;
        let device = api.open(settings.vid, settings.pid).map_err(open_error)?;

        Self::with_device(device, settings.gpio_mask, label)
    }
}

impl<W: ReportWriter> HidPtt<W> {
    /// Wrap an already open report sink and drive it idle
    pub fn with_device(device: W, mask: u8, label: String) -> Result<Self> {
        let mut ptt = Self {
            device: Some(device),
            mask,
            label,
            state: PttState::Idle,
        };

        // Hardware default is unknown; start from a known unkeyed state.
        ptt.set(false)?;
        tracing::info!(device = %ptt.label, "HID PTT ready");
        Ok(ptt)
    }
}

impl<W: ReportWriter> Ptt for HidPtt<W> {
    fn set(&mut self, on: bool) -> Result<()> {
        let device = self.device.as_mut().ok_or(Error::PttClosed)?;
        let report = gpio_report(self.mask, on);

        tracing::trace!(device = %self.label, report = ?report, "Writing GPIO report");
        device.write_report(&report)?;

        self.state = if on { PttState::Active } else { PttState::Idle };
        tracing::debug!(device = %self.label, state = %self.state, "PTT set");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.device.is_none() {
            return Ok(());
        }

        let unkeyed = if self.state == PttState::Active {
            self.set(false)
        } else {
            Ok(())
        };

        self.device = None;
        self.state = PttState::Closed;
        tracing::info!(device = %self.label, "HID PTT closed");
        unkeyed
    }

    fn state(&self) -> PttState {
        self.state
    }
}

impl<W: ReportWriter> Drop for HidPtt<W> {
    fn drop(&mut self) {
        if self.device.is_some() {
            tracing::debug!(device = %self.label, "HidPtt dropped, closing");
            if let Err(e) = self.close() {
                tracing::warn!(device = %self.label, error = %e, "Failed to unkey on drop");
            }
        }
    }
}
