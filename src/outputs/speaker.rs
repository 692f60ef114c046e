//! Speaker thread.
//!
//! Output streams are not `Send`, so the device lives on one dedicated thread
//! that takes `Play`/`Stop` commands and reports lifecycle events back to the
//! kernel, tagged with the generation the kernel handed out.

use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::InterviewResult;
use crate::kernel::event::{Event, PlaybackEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub enum SpeakerCommand {
    Play { generation: u64, clip: Vec<u8> },
    Stop,
}

/// One audio output backend, driven from the speaker thread only.
pub trait ClipSink {
    /// Replaces whatever is playing with `clip`.
    fn play(&mut self, clip: Vec<u8>) -> InterviewResult<()>;
    fn stop(&mut self);
    /// True once the current clip has run out.
    fn finished(&self) -> bool;
}

/// Plays nothing; every clip finishes immediately. Used when no output
/// device is compiled in or available.
#[derive(Debug, Default)]
pub struct MutedSink;

impl ClipSink for MutedSink {
    fn play(&mut self, clip: Vec<u8>) -> InterviewResult<()> {
        debug!(bytes = clip.len(), "muted clip");
        Ok(())
    }

    fn stop(&mut self) {}

    fn finished(&self) -> bool {
        true
    }
}

#[cfg(feature = "devices")]
pub use rodio_sink::RodioSink;

#[cfg(feature = "devices")]
mod rodio_sink {
    use std::io::Cursor;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::info;

    use super::ClipSink;
    use crate::error::{InterviewError, InterviewResult};

    pub struct RodioSink {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sink: Option<Sink>,
    }

    impl RodioSink {
        pub fn open() -> InterviewResult<Self> {
            let (stream, handle) = OutputStream::try_default()
                .map_err(|e| InterviewError::AudioDevice(e.to_string()))?;
            info!("speaker opened");
            Ok(Self {
                _stream: stream,
                handle,
                sink: None,
            })
        }
    }

    impl ClipSink for RodioSink {
        fn play(&mut self, clip: Vec<u8>) -> InterviewResult<()> {
            self.stop();
            let source = Decoder::new(Cursor::new(clip))
                .map_err(|e| InterviewError::Playback(format!("decode failed: {e}")))?;
            // A fresh sink per clip; a stopped sink is not reused.
            let sink = Sink::try_new(&self.handle)
                .map_err(|e| InterviewError::Playback(e.to_string()))?;
            sink.append(source.convert_samples::<f32>());
            self.sink = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn finished(&self) -> bool {
            self.sink.as_ref().map_or(true, Sink::empty)
        }
    }
}

/// Handle to the speaker thread.
pub struct Speaker {
    commands: std_mpsc::Sender<SpeakerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl Speaker {
    /// Spawns the speaker thread. `open` runs on that thread; if it fails the
    /// thread falls back to a muted sink so the turn flow keeps working.
    pub fn spawn<S, F>(open: F, events: mpsc::Sender<Event>, cancel: CancellationToken) -> Self
    where
        S: ClipSink,
        F: FnOnce() -> InterviewResult<S> + Send + 'static,
    {
        let (tx, rx) = std_mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("speaker".into())
            .spawn(move || match open() {
                Ok(sink) => run_sink(sink, rx, events, cancel),
                Err(err) => {
                    warn!(error = %err, "speaker unavailable, clips will be muted");
                    run_sink(MutedSink, rx, events, cancel)
                }
            })
            .map_err(|err| warn!(error = %err, "speaker thread failed to start"))
            .ok();
        Self {
            commands: tx,
            thread,
        }
    }

    /// Default output device when compiled with `devices`, muted otherwise.
    pub fn spawn_default(events: mpsc::Sender<Event>, cancel: CancellationToken) -> Self {
        #[cfg(feature = "devices")]
        let open = RodioSink::open;
        #[cfg(not(feature = "devices"))]
        let open = || -> InterviewResult<MutedSink> { Ok(MutedSink) };
        Self::spawn(open, events, cancel)
    }

    pub fn play(&self, generation: u64, clip: Vec<u8>) {
        self.send(SpeakerCommand::Play { generation, clip });
    }

    pub fn stop(&self) {
        self.send(SpeakerCommand::Stop);
    }

    fn send(&self, command: SpeakerCommand) {
        if self.commands.send(command).is_err() {
            warn!("speaker thread gone, command dropped");
        }
    }

    /// Waits for the thread after its cancel token fired.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_sink<S: ClipSink>(
    mut sink: S,
    commands: std_mpsc::Receiver<SpeakerCommand>,
    events: mpsc::Sender<Event>,
    cancel: CancellationToken,
) {
    info!("speaker thread started");
    let mut current: Option<u64> = None;
    let report = |event: PlaybackEvent| events.blocking_send(Event::Playback(event)).is_ok();

    while !cancel.is_cancelled() {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(SpeakerCommand::Play { generation, clip }) => {
                current = None;
                let alive = match sink.play(clip) {
                    Ok(()) => {
                        current = Some(generation);
                        report(PlaybackEvent::Started { generation })
                    }
                    Err(err) => report(PlaybackEvent::Failed {
                        generation,
                        reason: err.to_string(),
                    }),
                };
                if !alive {
                    break;
                }
            }
            Ok(SpeakerCommand::Stop) => {
                sink.stop();
                current = None;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(generation) = current {
            if sink.finished() {
                current = None;
                if !report(PlaybackEvent::Ended { generation }) {
                    break;
                }
            }
        }
    }
    sink.stop();
    info!("speaker thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn muted_clip_starts_then_ends() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let speaker = Speaker::spawn(|| Ok(MutedSink), tx, cancel.clone());

        speaker.play(7, vec![1, 2, 3]);

        let first = rx.recv().await;
        let second = rx.recv().await;
        assert!(matches!(
            first,
            Some(Event::Playback(PlaybackEvent::Started { generation: 7 }))
        ));
        assert!(matches!(
            second,
            Some(Event::Playback(PlaybackEvent::Ended { generation: 7 }))
        ));

        cancel.cancel();
        tokio::task::spawn_blocking(move || speaker.join())
            .await
            .unwrap();
    }
}
