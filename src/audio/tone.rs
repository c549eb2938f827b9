//! Test tone generation

use std::f64::consts::PI;

use crate::audio::sample_count;
use crate::constants::TONE_AMPLITUDE;

/// Generate a mono sine tone at 0.6 of full scale.
///
/// Produces `round(sample_rate × duration_s)` samples spaced evenly over
/// `[0, duration_s)`, so the end point is excluded and the first sample is 0.
pub fn generate_tone(duration_s: f64, sample_rate: u32, frequency_hz: f64) -> Vec<f32> {
    let n = sample_count(duration_s, sample_rate);
    if n == 0 {
        return Vec::new();
    }

    let step = duration_s / n as f64;
    let omega = 2.0 * PI * frequency_hz;

    (0..n)
        .map(|i| {
            let t = i as f64 * step;
            (TONE_AMPLITUDE * (omega * t).sin()) as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tone_length_for_default_run() {
        let tone = generate_tone(3.0, 48000, 1000.0);
        assert_eq!(tone.len(), 144_000);
        assert_eq!(tone[0], 0.0);
    }

    #[test]
    fn test_tone_peak_near_amplitude() {
        // 1 kHz at 48 kHz: sample 12 sits on the first crest
        let tone = generate_tone(0.01, 48000, 1000.0);
        assert!((tone[12] - 0.6).abs() < 1e-6);
        assert!((tone[36] + 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_tone_zero_length() {
        assert!(generate_tone(0.000_001, 8000, 440.0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_tone_shape(
            duration in 0.001f64..0.5,
            rate in 8000u32..96_000,
            freq in 1.0f64..20_000.0,
        ) {
            let tone = generate_tone(duration, rate, freq);
            prop_assert_eq!(tone.len(), (rate as f64 * duration).round() as usize);
            prop_assert!(tone.iter().all(|s| (-0.6f32..=0.6f32).contains(s)));
            if let Some(first) = tone.first() {
                prop_assert_eq!(*first, 0.0);
            }
        }

        #[test]
        fn prop_tone_deterministic(
            duration in 0.001f64..0.2,
            rate in 8000u32..48_000,
            freq in 1.0f64..4000.0,
        ) {
            let a = generate_tone(duration, rate, freq);
            let b = generate_tone(duration, rate, freq);
            prop_assert_eq!(a, b);
        }
    }
}
