use std::time::Duration;

use ringbuf::traits::Consumer;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::CaptureFormat;
use crate::kernel::audio::level::loudness_from_pcm;
use crate::kernel::audio::monitor::AudioFrame;
use crate::kernel::event::Event;

/// Cuts the raw sample stream into fixed analysis frames and measures each
/// one. Runs on its own thread; the kernel only ever sees `AudioFrame`s.
pub struct FrameSampler<C>
where
    C: Consumer<Item = f32> + Send,
{
    consumer: C,
    frame: Vec<f32>,
}

impl<C> FrameSampler<C>
where
    C: Consumer<Item = f32> + Send,
{
    pub fn new(consumer: C, format: &CaptureFormat) -> Self {
        Self {
            consumer,
            frame: vec![0.0; format.samples_per_frame().max(1)],
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame.len()
    }

    /// Pops one full frame if enough samples are buffered.
    pub fn next_frame(&mut self) -> Option<AudioFrame> {
        if self.consumer.occupied_len() < self.frame.len() {
            return None;
        }
        let popped = self.consumer.pop_slice(&mut self.frame);
        let samples = self.frame[..popped].to_vec();
        Some(AudioFrame::new(loudness_from_pcm(&samples), samples))
    }

    /// Every full frame currently buffered.
    pub fn drain(&mut self) -> Vec<AudioFrame> {
        std::iter::from_fn(|| self.next_frame()).collect()
    }

    /// Blocking loop. Ends on cancel or when the kernel side hangs up.
    pub fn run(mut self, tx: mpsc::Sender<Event>, cancel: CancellationToken) {
        info!(frame_len = self.frame.len(), "frame sampler started");
        while !cancel.is_cancelled() {
            let Some(frame) = self.next_frame() else {
                std::thread::sleep(Duration::from_millis(4));
                continue;
            };
            if tx.blocking_send(Event::Audio(frame)).is_err() {
                debug!("kernel channel closed, sampler exiting");
                break;
            }
        }
        info!("frame sampler stopped");
    }
}
