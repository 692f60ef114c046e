//! Async harness around the kernel.
//!
//! One task owns the reactor. Socket frames, microphone frames, speaker
//! events and console commands all arrive on a single channel, so the kernel
//! sees them strictly one at a time.

use std::io::BufRead;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ReactorConfig;
use crate::error::{InterviewError, InterviewResult};
use crate::kernel::effect::{Notice, SideEffect};
use crate::kernel::event::{ConnectionEvent, Event, UserCommand};
use crate::kernel::reactor::InterviewReactor;
use crate::kernel::session::{ConnectionState, Session, SessionRequest};
use crate::kernel::time::{Millis, TICK_MS};
use crate::kernel::transcript::{Role, Utterance};
use crate::outputs::speaker::Speaker;
use crate::protocol::socket::{self, SocketHandle};

const EVENT_QUEUE: usize = 512;

#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub request: SessionRequest,
    pub config: ReactorConfig,
}

/// Runs one interview to completion. Returns the closed session, if the
/// backend ever confirmed one.
pub async fn run(settings: Settings) -> InterviewResult<Option<Session>> {
    let Settings {
        url,
        request,
        mut config,
    } = settings;

    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_QUEUE);

    let microphone = open_microphone(&mut config, tx.clone(), cancel.clone());
    let speaker = Speaker::spawn_default(tx.clone(), cancel.clone());
    spawn_console(tx.clone(), cancel.clone());
    spawn_ctrl_c(tx.clone(), cancel.clone());

    let clock = Instant::now();
    let now = move || clock.elapsed().as_millis() as Millis;

    let mut reactor = InterviewReactor::new(config, request);
    let mut view = ConsoleView::default();

    let mut effects = reactor.step(now(), Event::Connection(ConnectionEvent::Connecting));
    if let Err(err) = &microphone {
        effects.extend(reactor.step(now(), Event::CaptureUnavailable(err.to_string())));
    }

    let socket = match socket::connect(&url, tx.clone(), cancel.clone()).await {
        Ok(socket) => socket,
        Err(err) => {
            error!(%url, error = %err, "could not connect");
            cancel.cancel();
            return Err(InterviewError::Connection(err.to_string()));
        }
    };
    effects.extend(reactor.step(now(), Event::Connection(ConnectionEvent::Opened)));
    apply(effects, &socket, &speaker, &mut view);

    let mut cadence = interval(Duration::from_millis(TICK_MS));
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("interview loop active");
    loop {
        let event = tokio::select! {
            _ = cadence.tick() => Event::Tick,
            next = rx.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };
        let effects = reactor.step(now(), event);
        apply(effects, &socket, &speaker, &mut view);
        if reactor.connection() == ConnectionState::Closed {
            break;
        }
    }

    socket.shutdown().await;
    cancel.cancel();
    drop(microphone);
    let _ = tokio::task::spawn_blocking(move || speaker.join()).await;

    let snapshot = reactor.telemetry.snapshot();
    info!(
        transitions = snapshot.turn_stats.transitions,
        rejected = snapshot.turn_stats.rejected,
        resets = snapshot.turn_stats.resets,
        segments = snapshot.capture_stats.segments_flushed,
        barge_ins = snapshot.interruption_stats.count,
        "interview loop finished"
    );

    let session = reactor.last_session().cloned();
    reactor.dispose();
    Ok(session)
}

fn apply(effects: Vec<SideEffect>, socket: &SocketHandle, speaker: &Speaker, view: &mut ConsoleView) {
    for effect in effects {
        match effect {
            SideEffect::Send(message) => socket.send(message),
            SideEffect::StartPlayback { generation, clip } => speaker.play(generation, clip),
            SideEffect::StopPlayback => speaker.stop(),
            SideEffect::CloseConnection => socket.close(),
            other => view.render(&other),
        }
    }
}

#[cfg(feature = "devices")]
type Microphone = crate::audio::capture::MicrophoneCapture;

#[cfg(not(feature = "devices"))]
type Microphone = ();

/// Starts capture and the frame sampler. The sample rate actually granted by
/// the device is written back into `config`.
#[cfg(feature = "devices")]
fn open_microphone(
    config: &mut ReactorConfig,
    tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
) -> InterviewResult<Microphone> {
    use crate::audio::capture::MicrophoneCapture;
    use crate::audio::processing::FrameSampler;
    use ringbuf::traits::Split;
    use ringbuf::HeapRb;

    let (producer, consumer) = HeapRb::<f32>::new(1 << 16).split();
    let capture = MicrophoneCapture::open(producer)?;
    config.capture.sample_rate = capture.sample_rate;

    let sampler = FrameSampler::new(consumer, &config.capture);
    std::thread::Builder::new()
        .name("frame-sampler".into())
        .spawn(move || sampler.run(tx, cancel))?;
    Ok(capture)
}

#[cfg(not(feature = "devices"))]
fn open_microphone(
    _config: &mut ReactorConfig,
    _tx: mpsc::Sender<Event>,
    _cancel: CancellationToken,
) -> InterviewResult<Microphone> {
    Err(InterviewError::AudioDevice(
        "built without audio device support".into(),
    ))
}

/// Plain lines are typed answers; `/send`, `/interrupt` and `/end` are commands.
pub fn parse_console_line(line: &str) -> Option<UserCommand> {
    let line = line.trim();
    match line {
        "" => None,
        "/send" => Some(UserCommand::SendNow),
        "/interrupt" => Some(UserCommand::Interrupt),
        "/end" => Some(UserCommand::EndInterview),
        text => Some(UserCommand::SubmitText(text.to_string())),
    }
}

// Stdin is read on a detached thread so a pending read never holds up
// runtime shutdown.
fn spawn_console(tx: mpsc::Sender<Event>, cancel: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                if cancel.is_cancelled() {
                    break;
                }
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(error = %err, "console read failed");
                        break;
                    }
                };
                let Some(command) = parse_console_line(&line) else { continue };
                if tx.blocking_send(Event::Command(command)).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        warn!(error = %err, "console input unavailable");
    }
}

fn spawn_ctrl_c(tx: mpsc::Sender<Event>, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!("ctrl-c, ending interview");
                    let _ = tx.send(Event::Command(UserCommand::EndInterview)).await;
                }
            }
            _ = cancel.cancelled() => {}
        }
    });
}

/// Terminal rendering of display effects.
#[derive(Default)]
struct ConsoleView {
    caption: String,
}

impl ConsoleView {
    fn render(&mut self, effect: &SideEffect) {
        match effect {
            SideEffect::Caption(line) => {
                if !line.is_empty() && *line != self.caption {
                    println!("  ~ {line}");
                }
                self.caption = line.clone();
            }
            SideEffect::Transcript(utterance) => self.render_utterance(utterance),
            SideEffect::Connection(state) => println!("[connection: {state:?}]"),
            SideEffect::Notice(Notice::CaptureUnavailable(reason)) => {
                println!("[microphone unavailable: {reason}; type your answers]")
            }
            SideEffect::Notice(Notice::PlaybackFailed(reason)) => {
                println!("[audio playback failed: {reason}]")
            }
            SideEffect::Notice(Notice::ServerError(message)) => println!("[server error: {message}]"),
            SideEffect::SessionComplete { session_id } => {
                println!("[interview {session_id} complete]")
            }
            _ => {}
        }
    }

    // Closed utterances only; open ones are still streaming.
    fn render_utterance(&self, utterance: &Utterance) {
        if utterance.open {
            return;
        }
        let who = match utterance.role {
            Role::Interviewer => "Interviewer",
            Role::Candidate => "You",
        };
        println!("{who}: {}", utterance.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_commands() {
        assert_eq!(parse_console_line("  "), None);
        assert_eq!(parse_console_line("/send"), Some(UserCommand::SendNow));
        assert_eq!(parse_console_line("/interrupt"), Some(UserCommand::Interrupt));
        assert_eq!(parse_console_line("/end\n"), Some(UserCommand::EndInterview));
        assert_eq!(
            parse_console_line("I led the migration"),
            Some(UserCommand::SubmitText("I led the migration".into()))
        );
    }
}
