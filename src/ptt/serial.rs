//! DTR/RTS push-to-talk on a serial port
//!
//! No data is ever sent; only the modem control lines are driven. Many
//! adapters wire DTR and RTS together into the PTT input, so both lines are
//! always written to the same level.
//!
//! The OS commonly asserts DTR/RTS when a port is opened, which would key the
//! radio. Both lines are forced inactive straight after opening and allowed
//! to settle before the controller is handed out.

use std::thread;
use std::time::Duration;

use crate::config::SerialSettings;
use crate::constants::{SERIAL_BAUD_RATE, SERIAL_LINE_STAGGER, SERIAL_OPEN_SETTLE};
use crate::ptt::{Ptt, PttState};
use crate::{Error, Result};

/// Modem control lines of an open port
pub trait ControlLines: Send {
    fn set_dtr(&mut self, level: bool) -> Result<()>;
    fn set_rts(&mut self, level: bool) -> Result<()>;
}

impl ControlLines for Box<dyn serialport::SerialPort> {
    fn set_dtr(&mut self, level: bool) -> Result<()> {
        self.write_data_terminal_ready(level)
            .map_err(|e| Error::Ptt(format!("failed to set DTR: {}", e)))
    }

    fn set_rts(&mut self, level: bool) -> Result<()> {
        self.write_request_to_send(level)
            .map_err(|e| Error::Ptt(format!("failed to set RTS: {}", e)))
    }
}

/// Line level for a PTT state, honouring active-low wiring
#[inline]
pub fn line_level(on: bool, active_low: bool) -> bool {
    on != active_low
}

/// Serial control-line PTT
pub struct SerialPtt<L: ControlLines = Box<dyn serialport::SerialPort>> {
    lines: Option<L>,
    port_name: String,
    active_low: bool,
    settle: Duration,
    state: PttState,
}

impl SerialPtt {
    /// Open `settings.port` at 9600 baud and force PTT off
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        tracing::debug!(
            port = %settings.port,
            baud_rate = SERIAL_BAUD_RATE,
            active_low = settings.active_low,
            settle_ms = settings.settle.as_millis(),
            "Opening serial PTT"
        );

        let port = serialport::new(&settings.port, SERIAL_BAUD_RATE)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| {
                tracing::error!(port = %settings.port, error = %e, "Failed to open serial port");
                Error::DeviceOpen {
                    device: format!("serial port {}", settings.port),
                    reason: e.to_string(),
                }
            })?;

        Self::with_lines(port, settings)
    }
}

impl<L: ControlLines> SerialPtt<L> {
    /// Wrap already open control lines and drive them inactive
    pub fn with_lines(lines: L, settings: &SerialSettings) -> Result<Self> {
        let mut ptt = Self {
            lines: Some(lines),
            port_name: settings.port.clone(),
            active_low: settings.active_low,
            settle: settings.settle,
            state: PttState::Idle,
        };

        let off = line_level(false, ptt.active_low);
        if let Some(lines) = ptt.lines.as_mut() {
            lines.set_rts(off)?;
            lines.set_dtr(off)?;
        }
        thread::sleep(SERIAL_OPEN_SETTLE);

        tracing::info!(
            port = %ptt.port_name,
            baud_rate = SERIAL_BAUD_RATE,
            "Serial PTT ready"
        );
        Ok(ptt)
    }
}

impl<L: ControlLines> Ptt for SerialPtt<L> {
    fn set(&mut self, on: bool) -> Result<()> {
        let lines = self.lines.as_mut().ok_or(Error::PttClosed)?;
        let level = line_level(on, self.active_low);

        lines.set_dtr(level)?;
        thread::sleep(SERIAL_LINE_STAGGER);
        lines.set_rts(level)?;
        thread::sleep(self.settle);

        self.state = if on { PttState::Active } else { PttState::Idle };
        tracing::debug!(port = %self.port_name, level, state = %self.state, "PTT set");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.lines.is_none() {
            return Ok(());
        }

        let unkeyed = if self.state == PttState::Active {
            self.set(false)
        } else {
            Ok(())
        };

        // The port is closed when dropped
        self.lines = None;
        self.state = PttState::Closed;
        tracing::info!(port = %self.port_name, "Serial PTT closed");
        unkeyed
    }

    fn state(&self) -> PttState {
        self.state
    }
}

impl<L: ControlLines> Drop for SerialPtt<L> {
    fn drop(&mut self) {
        if self.lines.is_some() {
            tracing::debug!(port = %self.port_name, "SerialPtt dropped, closing port");
            if let Err(e) = self.close() {
                tracing::warn!(port = %self.port_name, error = %e, "Failed to unkey on drop");
            }
        }
    }
}
