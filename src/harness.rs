//! The test sequence
//!
//! Resolve devices, open PTT, key, play the tone, unkey, record, save.
//! Every step must succeed before the next one runs. Once the PTT controller
//! is open it is closed on every exit path, unwinding included, so a failed
//! run never leaves the transmitter keyed or the device claimed.

use std::path::PathBuf;
use std::thread;

use crate::audio::{
    find_device, generate_tone, sample_count, write_wav, AudioBackend, AudioDevice, Direction,
    LevelStats,
};
use crate::config::{Config, PttConfig};
use crate::constants::{PTT_KEY_DELAY, RX_WAV_FILE};
use crate::ptt::{PttGuard, SharedPtt};
use crate::Result;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub tx_device: AudioDevice,
    pub rx_device: AudioDevice,
    /// Samples in the transmitted tone
    pub tx_samples: usize,
    /// Samples written to the WAV file
    pub rx_samples: usize,
    pub output: PathBuf,
    pub rx_levels: LevelStats,
}

/// One-shot loopback test
pub struct Harness<'a, B: AudioBackend> {
    config: &'a Config,
    backend: B,
    output: PathBuf,
}

impl<'a, B: AudioBackend> Harness<'a, B> {
    pub fn new(config: &'a Config, backend: B) -> Self {
        Self {
            config,
            backend,
            output: PathBuf::from(RX_WAV_FILE),
        }
    }

    /// Write the recording somewhere other than the working directory
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Run the sequence.
    ///
    /// `open_ptt` is called after both audio devices are resolved.
    pub fn run<F>(&mut self, open_ptt: F) -> Result<RunReport>
    where
        F: FnOnce(&PttConfig) -> Result<SharedPtt>,
    {
        let aioc = &self.config.aioc;
        tracing::info!(
            tx = %aioc.tx_device_name,
            rx = %aioc.rx_device_name,
            "Locating AIOC devices"
        );

        let devices = self.backend.devices()?;
        let tx = find_device(&devices, &aioc.tx_device_name, Direction::Out)?.clone();
        let rx = find_device(&devices, &aioc.rx_device_name, Direction::In)?.clone();
        tracing::info!(
            tx_index = tx.index,
            tx_name = %tx.name,
            rx_index = rx.index,
            rx_name = %rx.name,
            "Devices resolved"
        );

        let ptt = PttGuard::new(open_ptt(&self.config.ptt)?);
        let outcome = self.transmit_and_record(&ptt, tx, rx);
        let closed = ptt.close();

        match outcome {
            Ok(report) => {
                closed?;
                tracing::info!(
                    output = %report.output.display(),
                    rx_peak_db = report.rx_levels.peak_db,
                    rx_rms_db = report.rx_levels.rms_db,
                    "Test complete"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "Failed to release PTT after error");
                }
                Err(e)
            }
        }
    }

    fn transmit_and_record(
        &mut self,
        ptt: &SharedPtt,
        tx: AudioDevice,
        rx: AudioDevice,
    ) -> Result<RunReport> {
        let audio = &self.config.audio;
        let tone = generate_tone(audio.tx_duration, audio.sample_rate, audio.tx_tone_hz);
        tracing::debug!(
            samples = tone.len(),
            tone_hz = audio.tx_tone_hz,
            "TX tone generated"
        );

        tracing::info!("Asserting PTT");
        ptt.set(true)?;
        thread::sleep(PTT_KEY_DELAY);

        tracing::info!(seconds = audio.tx_duration, "Transmitting audio");
        let played = self.backend.play(&tx, &tone, audio.sample_rate);

        tracing::info!("Releasing PTT");
        let released = ptt.set(false);
        played?;
        released?;

        tracing::info!(
            seconds = audio.rx_record_time,
            output = %self.output.display(),
            "Recording RX audio"
        );
        let frames = sample_count(audio.rx_record_time, audio.sample_rate);
        let recording = self.backend.record(&rx, frames, audio.sample_rate)?;

        write_wav(&self.output, &recording, audio.sample_rate)?;

        let rx_levels = LevelStats::measure(&recording);
        if rx_levels.is_silent() {
            tracing::warn!("RX recording is silent");
        }

        Ok(RunReport {
            tx_device: tx,
            rx_device: rx,
            tx_samples: tone.len(),
            rx_samples: recording.len(),
            output: self.output.clone(),
            rx_levels,
        })
    }
}
