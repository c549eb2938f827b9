//! Blocking capture from an input device
//!
//! Only the first channel of each frame is kept. The callback owns the
//! buffer and hands it over through a channel once it holds the requested
//! number of frames.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::audio::device::{stream_config, Direction};
use crate::constants::STREAM_GRACE;
use crate::error::AudioError;

type Captured = std::result::Result<Vec<f32>, String>;

/// Record `frames` mono samples at `sample_rate`, blocking until full.
pub fn record_blocking(
    device: &cpal::Device,
    frames: usize,
    sample_rate: u32,
) -> Result<Vec<f32>, AudioError> {
    if frames == 0 {
        return Ok(Vec::new());
    }

    let supported = stream_config(device, Direction::In, sample_rate)?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    tracing::debug!(
        channels = config.channels,
        sample_rate = config.sample_rate.0,
        format = ?sample_format,
        frames,
        "Opening capture stream"
    );

    let (tx, rx) = bounded::<Captured>(4);
    let stream = match sample_format {
        SampleFormat::F32 => build_input::<f32>(device, &config, frames, tx)?,
        SampleFormat::I16 => build_input::<i16>(device, &config, frames, tx)?,
        other => {
            return Err(AudioError::StreamError(format!(
                "unsupported input sample format: {}",
                other
            )))
        }
    };

    stream.play()?;

    let nominal = Duration::from_secs_f64(frames as f64 / sample_rate as f64);
    let limit = nominal + STREAM_GRACE;
    let outcome = rx.recv_timeout(limit);
    drop(stream);

    match outcome {
        Ok(Ok(samples)) => Ok(samples),
        Ok(Err(e)) => Err(AudioError::StreamError(e)),
        Err(RecvTimeoutError::Timeout) => Err(AudioError::Timeout("recording", limit)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(AudioError::StreamError("capture stream closed".into()))
        }
    }
}

/// Append the first channel of each interleaved frame until `buffer` holds
/// `frames` samples. Returns true once it is full.
fn collect_first_channel<T>(
    buffer: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    frames: usize,
) -> bool
where
    T: Sample,
    f32: FromSample<T>,
{
    let wanted = frames.saturating_sub(buffer.len());
    buffer.extend(
        data.chunks(channels)
            .take(wanted)
            .map(|frame| f32::from_sample(frame[0])),
    );
    buffer.len() >= frames
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    frames: usize,
    tx: Sender<Captured>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let error_tx = tx.clone();
    let mut buffer: Vec<f32> = Vec::with_capacity(frames);
    let mut delivered = false;

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if delivered {
                return;
            }

            if collect_first_channel(&mut buffer, data, channels, frames) {
                delivered = true;
                let _ = tx.try_send(Ok(std::mem::take(&mut buffer)));
            }
        },
        move |err| {
            let _ = error_tx.try_send(Err(err.to_string()));
        },
        None,
    )?;

    Ok(stream)
}
