//! Peak and RMS level of a recorded buffer
//!
//! Diagnostic only: lets the operator see at a glance whether the receiver
//! actually delivered audio. Levels are in dBFS, floored at -96 dB.

/// Minimum reported level (digital silence)
pub const FLOOR_DB: f32 = -96.0;

/// Convert a linear amplitude to dBFS
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        FLOOR_DB
    } else {
        (20.0 * amplitude.log10()).max(FLOOR_DB)
    }
}

/// Levels of one buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStats {
    /// Largest absolute sample, dBFS
    pub peak_db: f32,
    /// Root mean square, dBFS
    pub rms_db: f32,
}

impl LevelStats {
    pub fn measure(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self {
                peak_db: FLOOR_DB,
                rms_db: FLOOR_DB,
            };
        }

        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        let rms = (sum_sq / samples.len() as f64).sqrt() as f32;

        Self {
            peak_db: amplitude_to_db(peak),
            rms_db: amplitude_to_db(rms),
        }
    }

    /// Nothing above the floor was captured
    pub fn is_silent(&self) -> bool {
        self.peak_db <= FLOOR_DB
    }
}
