//! Push-to-talk control
//!
//! Two ways of keying the radio through the AIOC:
//!
//! - [`HidPtt`]: CM108-compatible HID output report driving a GPIO line
//! - [`SerialPtt`]: DTR/RTS levels on the adapter's virtual COM port
//!
//! Both start idle, move between idle and active with [`Ptt::set`] and end
//! in a terminal closed state after [`Ptt::close`].

pub mod hid;
pub mod serial;

pub use hid::HidPtt;
pub use serial::SerialPtt;

use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::{PttConfig, PttSettings};
use crate::Result;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttState {
    /// Transmitter unkeyed
    Idle,
    /// Transmitter keyed
    Active,
    /// Handle released, no further use
    Closed,
}

impl fmt::Display for PttState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PttState::Idle => write!(f, "idle"),
            PttState::Active => write!(f, "active"),
            PttState::Closed => write!(f, "closed"),
        }
    }
}

/// A transmit-key strategy
pub trait Ptt: Send {
    /// Key (`true`) or unkey (`false`) the transmitter.
    ///
    /// Fails with [`Error::PttClosed`](crate::Error::PttClosed) after
    /// [`close`](Ptt::close).
    fn set(&mut self, on: bool) -> Result<()>;

    /// Unkey if keyed, then release the device handle.
    ///
    /// Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Current state
    fn state(&self) -> PttState;
}

/// Open the controller selected by `[ptt] mode`.
///
/// The section is validated before any device is touched.
pub fn open(config: &PttConfig) -> Result<Box<dyn Ptt>> {
    let settings = config.settings()?;
    tracing::info!(mode = %settings.mode(), "Opening PTT controller");

    match settings {
        PttSettings::Hid(s) => Ok(Box::new(HidPtt::open(&s)?)),
        PttSettings::Serial(s) => Ok(Box::new(SerialPtt::open(&s)?)),
    }
}

/// Controller shared between the test sequence and the Ctrl+C handler
#[derive(Clone)]
pub struct SharedPtt {
    inner: Arc<Mutex<Box<dyn Ptt>>>,
}

impl SharedPtt {
    pub fn new(ptt: Box<dyn Ptt>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ptt)),
        }
    }

    pub fn set(&self, on: bool) -> Result<()> {
        self.inner.lock().set(on)
    }

    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }

    pub fn state(&self) -> PttState {
        self.inner.lock().state()
    }
}

/// Closes the shared controller when dropped, including during a panic.
///
/// Other clones (such as the Ctrl+C handler's) may outlive the run, so the
/// controller's own `Drop` cannot be relied on.
pub struct PttGuard {
    ptt: SharedPtt,
}

impl PttGuard {
    pub fn new(ptt: SharedPtt) -> Self {
        Self { ptt }
    }
}

impl Deref for PttGuard {
    type Target = SharedPtt;

    fn deref(&self) -> &SharedPtt {
        &self.ptt
    }
}

impl Drop for PttGuard {
    fn drop(&mut self) {
        if self.ptt.state() == PttState::Closed {
            return;
        }
        if let Err(e) = self.ptt.close() {
            tracing::error!(error = %e, "Failed to release PTT");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_open_rejects_bogus_mode_before_io() {
        let config = PttConfig {
            mode: "bogus".into(),
            // would fail to open if any I/O were attempted
            com_port: Some("/dev/does-not-exist".into()),
            ..Default::default()
        };
        match open(&config) {
            Err(Error::Config(msg)) => assert!(msg.contains("bogus")),
            Err(other) => panic!("expected config error, got {}", other),
            Ok(_) => panic!("bogus mode accepted"),
        }
    }

    #[test]
    fn test_open_missing_serial_port_is_device_open_error() {
        let config = PttConfig {
            mode: "serial".into(),
            com_port: Some("/dev/aioc-tester-no-such-port".into()),
            serial_active_low: Some(false),
            serial_settle_time: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(open(&config), Err(Error::DeviceOpen { .. })));
    }

    struct Counter {
        state: PttState,
    }

    impl Ptt for Counter {
        fn set(&mut self, on: bool) -> Result<()> {
            if self.state == PttState::Closed {
                return Err(Error::PttClosed);
            }
            self.state = if on { PttState::Active } else { PttState::Idle };
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.state = PttState::Closed;
            Ok(())
        }

        fn state(&self) -> PttState {
            self.state
        }
    }

    #[test]
    fn test_shared_ptt_clones_see_same_controller() {
        let shared = SharedPtt::new(Box::new(Counter {
            state: PttState::Idle,
        }));
        let handle = shared.clone();

        shared.set(true).unwrap();
        assert_eq!(handle.state(), PttState::Active);

        handle.close().unwrap();
        assert_eq!(shared.state(), PttState::Closed);
        assert!(matches!(shared.set(false), Err(Error::PttClosed)));
    }

    #[test]
    fn test_guard_closes_on_unwind() {
        let shared = SharedPtt::new(Box::new(Counter {
            state: PttState::Idle,
        }));
        let handle = shared.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let guard = PttGuard::new(shared);
            guard.set(true).unwrap();
            panic!("stream callback blew up");
        }));

        assert!(result.is_err());
        assert_eq!(handle.state(), PttState::Closed);
    }

    #[test]
    fn test_guard_leaves_closed_controller_alone() {
        let shared = SharedPtt::new(Box::new(Counter {
            state: PttState::Idle,
        }));
        let handle = shared.clone();

        let guard = PttGuard::new(shared);
        guard.close().unwrap();
        drop(guard);

        assert_eq!(handle.state(), PttState::Closed);
        assert!(matches!(handle.set(true), Err(Error::PttClosed)));
    }
}
