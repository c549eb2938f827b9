//! WAV output for the RX recording

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Convert an f32 sample to 16-bit PCM, clamping to `[-1.0, 1.0]` first.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Write `samples` as a mono 16-bit PCM WAV file, replacing any existing file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(f32_to_i16(sample))?;
    }
    writer.finalize()?;

    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        "WAV written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(2.5), i16::MAX);
        assert_eq!(f32_to_i16(-4.0), -i16::MAX);
    }

    #[test]
    fn test_write_wav_header_and_duration() {
        let path = std::env::temp_dir().join(format!("aioc-wav-test-{}.wav", std::process::id()));
        let samples = vec![0.25f32; 240_000];

        write_wav(&path, &samples, 48000).unwrap();
        // second write overwrites rather than appends
        write_wav(&path, &samples, 48000).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(reader.duration(), 240_000);
        assert_eq!(reader.duration() as f64 / spec.sample_rate as f64, 5.0);

        std::fs::remove_file(&path).ok();
    }
}
