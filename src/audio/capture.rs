use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::Producer;
use tracing::{error, info};

use crate::error::{InterviewError, InterviewResult};

/// Rates tried in order. The kernel works at any rate; 16 kHz keeps the
/// uploaded clips small.
const PREFERRED_RATES: [u32; 4] = [16000, 48000, 44100, 32000];

/// Live microphone. Mono f32 samples are pushed into the ring buffer from the
/// device callback; the stream stops when this value is dropped.
pub struct MicrophoneCapture {
    _stream: cpal::Stream,
    pub sample_rate: u32,
    pub device_name: String,
}

impl MicrophoneCapture {
    pub fn open<P>(mut producer: P) -> InterviewResult<Self>
    where
        P: Producer<Item = f32> + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| InterviewError::AudioDevice("no input device available".into()))?;
        let device_name = device.name().unwrap_or_default();

        let mut selected = None;
        for &rate in &PREFERRED_RATES {
            selected = device.supported_input_configs()?.find_map(|range| {
                (range.min_sample_rate().0 <= rate && range.max_sample_rate().0 >= rate)
                    .then(|| range.with_sample_rate(cpal::SampleRate(rate)))
            });
            if selected.is_some() {
                break;
            }
        }
        let config = match selected {
            Some(config) => config,
            None => device.default_input_config()?,
        };

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        info!(device = %device_name, sample_rate, channels, "microphone opened");

        let err_fn = |err| error!(error = %err, "input stream error");

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| push_mono(data, channels, &mut producer, |s| s),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &_| {
                    push_mono(data, channels, &mut producer, |s| s as f32 / i16::MAX as f32)
                },
                err_fn,
                None,
            )?,
            other => {
                return Err(InterviewError::AudioDevice(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        };

        stream.play()?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            device_name,
        })
    }
}

// Averages interleaved channels. A full buffer drops samples rather than block
// the device callback.
fn push_mono<T, P, F>(input: &[T], channels: usize, producer: &mut P, to_f32: F)
where
    T: Copy,
    P: Producer<Item = f32>,
    F: Fn(T) -> f32,
{
    let channels = channels.max(1);
    for frame in input.chunks(channels) {
        let sum: f32 = frame.iter().map(|&s| to_f32(s)).sum();
        let _ = producer.try_push(sum / frame.len() as f32);
    }
}
