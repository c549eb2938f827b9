//! AIOC Test Application
//!
//! Keys the radio through the AIOC, transmits a test tone, unkeys and records
//! the receiver to `aioc_rx_test.wav`.
//!
//! Usage: `aioc-test [CONFIG_PATH]` (defaults to `aioc_test.toml`)

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aioc_tester::{
    audio::CpalBackend,
    config::Config,
    harness::Harness,
    ptt::{self, SharedPtt},
};

/// Exit status after Ctrl+C, as a shell would report SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config_path = Config::locate(explicit)?;
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    tracing::info!(
        path = %config_path.display(),
        ptt_mode = %config.ptt.mode,
        sample_rate = config.audio.sample_rate,
        "Configuration loaded"
    );

    let mut harness = Harness::new(&config, CpalBackend::new());
    let report = harness
        .run(|ptt_config| {
            let ptt = SharedPtt::new(ptt::open(ptt_config)?);
            install_interrupt_handler(ptt.clone());
            Ok(ptt)
        })
        .context("AIOC test failed")?;

    println!("\n=== AIOC Test Complete ===");
    println!("  TX device: #{} {}", report.tx_device.index, report.tx_device.name);
    println!("  RX device: #{} {}", report.rx_device.index, report.rx_device.name);
    println!("  TX samples: {}", report.tx_samples);
    println!(
        "  RX recording: {} ({} samples, peak {:.1} dBFS, RMS {:.1} dBFS)",
        report.output.display(),
        report.rx_samples,
        report.rx_levels.peak_db,
        report.rx_levels.rms_db
    );

    Ok(())
}

/// Unkey and release the PTT device if the user interrupts the run
fn install_interrupt_handler(ptt: SharedPtt) {
    let result = ctrlc::set_handler(move || {
        tracing::warn!("Interrupted, releasing PTT");
        if let Err(e) = ptt.close() {
            tracing::error!(error = %e, "Failed to release PTT");
        }
        std::process::exit(INTERRUPTED_EXIT_CODE);
    });

    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
    }
}
