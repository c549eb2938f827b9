//! Blocking playback to an output device
//!
//! The mono buffer is copied into the cpal callback and fanned out to every
//! channel of the chosen stream config. The first callback that has only
//! silence left to write reports the stream's output latency on a completion
//! channel. The calling thread waits that long again before stopping the
//! stream, so the last buffer of tone is heard in full.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::audio::device::{stream_config, Direction};
use crate::constants::STREAM_GRACE;
use crate::error::AudioError;

/// Ok carries how long the device still needs to play out queued audio
type Completion = std::result::Result<Duration, String>;

/// Play `samples` (mono) at `sample_rate` and block until done.
pub fn play_blocking(
    device: &cpal::Device,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), AudioError> {
    if samples.is_empty() {
        return Ok(());
    }

    let supported = stream_config(device, Direction::Out, sample_rate)?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    tracing::debug!(
        channels = config.channels,
        sample_rate = config.sample_rate.0,
        format = ?sample_format,
        samples = samples.len(),
        "Opening playback stream"
    );

    let (done_tx, done_rx) = bounded::<Completion>(4);
    let stream = match sample_format {
        SampleFormat::F32 => build_output::<f32>(device, &config, samples.to_vec(), done_tx)?,
        SampleFormat::I16 => build_output::<i16>(device, &config, samples.to_vec(), done_tx)?,
        other => {
            return Err(AudioError::StreamError(format!(
                "unsupported output sample format: {}",
                other
            )))
        }
    };

    stream.play()?;

    let nominal = Duration::from_secs_f64(samples.len() as f64 / sample_rate as f64);
    let limit = nominal + STREAM_GRACE;
    let outcome = done_rx.recv_timeout(limit);

    if let Ok(Ok(tail)) = outcome {
        tracing::trace!(?tail, "Waiting for output to drain");
        thread::sleep(tail);
    }
    drop(stream);

    match outcome {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(AudioError::StreamError(e)),
        Err(RecvTimeoutError::Timeout) => Err(AudioError::Timeout("playback", limit)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(AudioError::StreamError("playback stream closed".into()))
        }
    }
}

/// Write the next frames of `samples` into an interleaved output buffer.
///
/// Every channel of a frame gets the same value; frames past the end are
/// silence. Returns true when `samples` was already exhausted on entry, so
/// the buffer written by the previous call held the last of the tone.
fn fill_frames<T>(samples: &[f32], pos: &mut usize, data: &mut [T], channels: usize) -> bool
where
    T: Sample + FromSample<f32>,
{
    let drained = *pos >= samples.len();

    for frame in data.chunks_mut(channels) {
        let value = samples.get(*pos).copied().unwrap_or(0.0);
        if *pos < samples.len() {
            *pos += 1;
        }
        for out in frame.iter_mut() {
            *out = T::from_sample(value);
        }
    }

    drained
}

/// Time left before the previous callback's buffer has been played.
///
/// That buffer reaches the speaker no later than `latency` (callback to
/// playback) plus one period. Without a timestamp two periods are assumed.
fn drain_tail(latency: Option<Duration>, frames: usize, sample_rate: u32) -> Duration {
    let nanos = frames as u64 * 1_000_000_000 / u64::from(sample_rate.max(1));
    let period = Duration::from_nanos(nanos);
    (latency.unwrap_or(period) + period).min(STREAM_GRACE)
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Vec<f32>,
    done_tx: Sender<Completion>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;
    let error_tx = done_tx.clone();
    let mut pos = 0usize;
    let mut signalled = false;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
            let drained = fill_frames(&samples, &mut pos, data, channels);

            if drained && !signalled {
                signalled = true;
                let stamp = info.timestamp();
                let latency = stamp.playback.duration_since(&stamp.callback);
                let tail = drain_tail(latency, data.len() / channels, sample_rate);
                let _ = done_tx.try_send(Ok(tail));
            }
        },
        move |err| {
            let _ = error_tx.try_send(Err(err.to_string()));
        },
        None,
    )?;

    Ok(stream)
}
