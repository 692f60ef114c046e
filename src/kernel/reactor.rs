use tracing::{debug, info, warn};

use super::audio::monitor::{VadSignal, VoiceActivityDetector};
use super::audio::segment::CapturedSegment;
use super::caption::{polish, CaptionPacer};
use super::effect::{Notice, SideEffect};
use super::event::{ConnectionEvent, Event, PlaybackEvent, UserCommand};
use super::playback::{PlaybackController, SinkOutcome};
use super::session::{ConnectionState, Session, SessionRequest};
use super::state::{Metadata, Origin, TurnState, TurnStateMachine};
use super::telemetry::event::{CloseReason, DropReason, InterruptSource, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{elapsed, Millis};
use super::timer::Deadline;
use super::transcript::Transcript;
use crate::config::ReactorConfig;
use crate::protocol::message::{ClientMessage, ServerMessage};

/// Kernel timers, in the order they win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TimerKind {
    Silence,
    CaptionTick,
    CaptionClear,
    Dwell,
    InterruptResume,
}

/// Pure turn-taking kernel.
///
/// **KERNEL LAW**: `step` never awaits and never performs I/O. Time only
/// moves when the caller passes a later `now`; every timer that fell due in
/// between fires first, at its own due time, before the event is applied.
pub struct InterviewReactor {
    config: ReactorConfig,
    request: SessionRequest,
    machine: TurnStateMachine,
    vad: VoiceActivityDetector,
    caption: CaptionPacer,
    playback: PlaybackController,
    transcript: Transcript,
    session: Option<Session>,
    last_session: Option<Session>,
    connection: ConnectionState,
    interrupt_resume: Deadline,
    ai_turn_started_at: Option<Millis>,
    capture_available: bool,
    now: Millis,
    pub telemetry: TelemetryRecorder,
}

impl InterviewReactor {
    pub fn new(config: ReactorConfig, request: SessionRequest) -> Self {
        let vad = VoiceActivityDetector::new(config.vad.clone(), config.capture.sample_rate);
        let caption = CaptionPacer::new(config.caption.clone());
        let playback = PlaybackController::new(config.playback.clone());
        Self {
            config,
            request,
            machine: TurnStateMachine::new(0),
            vad,
            caption,
            playback,
            transcript: Transcript::new(),
            session: None,
            last_session: None,
            connection: ConnectionState::Connecting,
            interrupt_resume: Deadline::new(),
            ai_turn_started_at: None,
            capture_available: true,
            now: 0,
            telemetry: TelemetryRecorder::new(),
        }
    }

    /// Advances kernel time to `now`, fires due timers, then applies `event`.
    pub fn step(&mut self, now: Millis, event: Event) -> Vec<SideEffect> {
        let now = now.max(self.now);
        self.now = now;

        let mut effects = Vec::new();
        self.fire_due_timers(now, &mut effects);

        match event {
            Event::Tick => {}
            Event::Connection(ev) => self.on_connection(ev, now, &mut effects),
            Event::Server(msg) => self.on_server(msg, now, &mut effects),
            Event::Audio(frame) => {
                if let Some(VadSignal::BargeIn) = self.vad.process(&frame, now) {
                    self.barge_in(now, InterruptSource::VoiceActivity, &mut effects);
                }
            }
            Event::CaptureUnavailable(reason) => {
                warn!(%reason, "microphone unavailable, text input only");
                self.capture_available = false;
                self.vad.abort();
                effects.push(SideEffect::Notice(Notice::CaptureUnavailable(reason)));
            }
            Event::Playback(ev) => self.on_playback(ev, now, &mut effects),
            Event::Command(cmd) => self.on_command(cmd, now, &mut effects),
        }

        effects
    }

    /// Shorthand for a cadence step.
    pub fn advance(&mut self, now: Millis) -> Vec<SideEffect> {
        self.step(now, Event::Tick)
    }

    /// Earliest armed timer, for drivers that sleep until the next deadline.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers().into_iter().map(|(due, _)| due).min()
    }

    fn timers(&self) -> Vec<(Millis, TimerKind)> {
        [
            (self.vad.silence_deadline(), TimerKind::Silence),
            (self.caption.next_tick(), TimerKind::CaptionTick),
            (self.caption.clear_deadline(), TimerKind::CaptionClear),
            (self.playback.dwell_deadline(), TimerKind::Dwell),
            (self.interrupt_resume.due(), TimerKind::InterruptResume),
        ]
        .into_iter()
        .filter_map(|(due, kind)| due.map(|d| (d, kind)))
        .collect()
    }

    // Each fire disarms or re-arms its timer later than `at`, so this ends.
    fn fire_due_timers(&mut self, now: Millis, effects: &mut Vec<SideEffect>) {
        while let Some((at, kind)) = self
            .timers()
            .into_iter()
            .filter(|(due, _)| *due <= now)
            .min()
        {
            self.fire(kind, at, effects);
        }
    }

    fn fire(&mut self, kind: TimerKind, at: Millis, effects: &mut Vec<SideEffect>) {
        match kind {
            TimerKind::Silence => {
                if let Some(segment) = self.vad.on_silence_timeout(at) {
                    self.flush_segment(segment, at, effects);
                }
            }
            TimerKind::CaptionTick => {
                if let Some(line) = self.caption.on_tick(at) {
                    effects.push(SideEffect::Caption(polish(&line)));
                }
            }
            TimerKind::CaptionClear => {
                if self.caption.on_clear(at) {
                    effects.push(SideEffect::Caption(String::new()));
                }
            }
            TimerKind::Dwell => {
                if self.playback.on_dwell(at) {
                    self.resume_listening(at, "audio_finished", effects);
                }
            }
            TimerKind::InterruptResume => {
                if self.interrupt_resume.poll(at).is_some() {
                    self.resume_listening(at, "interrupt_resume", effects);
                }
            }
        }
    }

    fn on_connection(&mut self, ev: ConnectionEvent, now: Millis, effects: &mut Vec<SideEffect>) {
        match ev {
            ConnectionEvent::Connecting => {
                self.connection = ConnectionState::Connecting;
                effects.push(SideEffect::Connection(ConnectionState::Connecting));
            }
            ConnectionEvent::Opened => {
                if self.connection == ConnectionState::Open {
                    return;
                }
                info!(
                    candidate = %self.request.candidate_name,
                    role = %self.request.job_role,
                    "connected, starting interview"
                );
                self.connection = ConnectionState::Open;
                effects.push(SideEffect::Connection(ConnectionState::Open));
                effects.push(SideEffect::Send(ClientMessage::StartInterview {
                    candidate_name: self.request.candidate_name.clone(),
                    job_role: self.request.job_role.clone(),
                }));
            }
            ConnectionEvent::Closed { reason } => {
                if self.connection != ConnectionState::Closed {
                    warn!(reason = reason.as_deref().unwrap_or("-"), "connection closed");
                }
                self.teardown(now, CloseReason::ConnectionLost, effects);
            }
        }
    }

    fn on_server(&mut self, msg: ServerMessage, now: Millis, effects: &mut Vec<SideEffect>) {
        if self.connection != ConnectionState::Open {
            debug!(kind = msg.kind(), "message after close ignored");
            return;
        }

        match msg {
            ServerMessage::SessionCreated { session_id } => {
                if let Some(existing) = &self.session {
                    warn!(session = %existing.id, "duplicate session_created ignored");
                    return;
                }
                let session = Session::new(session_id, &self.request);
                info!(session = %session.id, "session created");
                self.session = Some(session);
                self.transition(TurnState::Listening, now, "session_created");
            }
            ServerMessage::TextChunk(text) => {
                let utterance = self.transcript.append_interviewer(&text).clone();
                effects.push(SideEffect::Transcript(utterance));
                self.caption.push_text(&text);
            }
            ServerMessage::AudioOutput(b64) => self.start_clip(&b64, now, effects),
            ServerMessage::Transcription(text) => {
                let utterance = self.transcript.add_candidate(&text).clone();
                effects.push(SideEffect::Transcript(utterance));
            }
            ServerMessage::ResponseComplete => {
                if let Some(utterance) = self.transcript.close_open() {
                    effects.push(SideEffect::Transcript(utterance.clone()));
                }
            }
            ServerMessage::Report(report) => self.begin_wrap_up(report, now, effects),
            ServerMessage::Error(message) => {
                warn!(%message, "backend error");
                effects.push(SideEffect::Notice(Notice::ServerError(message)));
            }
            ServerMessage::Unknown(kind) => debug!(%kind, "unknown message ignored"),
        }
    }

    fn start_clip(&mut self, b64: &str, now: Millis, effects: &mut Vec<SideEffect>) {
        let (handle, superseded) = self.playback.begin();
        if superseded {
            self.telemetry.record(TelemetryEvent::PlaybackSuperseded);
            effects.push(SideEffect::StopPlayback);
        }

        match decode_clip(b64) {
            Ok(clip) => effects.push(SideEffect::StartPlayback {
                generation: handle.generation,
                clip,
            }),
            Err(err) => {
                warn!(error = %err, "undecodable clip");
                self.clip_failed(handle.generation, err.to_string(), now, effects);
            }
        }
    }

    fn begin_wrap_up(&mut self, report: serde_json::Value, now: Millis, effects: &mut Vec<SideEffect>) {
        let Some(session) = self.session.as_mut() else {
            warn!("report without a session ignored");
            return;
        };
        info!(session = %session.id, "final report received, wrapping up");
        session.wrapping_up = true;
        session.report = Some(report);

        // Nothing left to finish: close right away.
        if !self.playback.is_busy()
            && !self.interrupt_resume.is_armed()
            && self.machine.state() != TurnState::AiSpeaking
        {
            self.complete_session(now, effects);
        }
    }

    fn on_playback(&mut self, ev: PlaybackEvent, now: Millis, effects: &mut Vec<SideEffect>) {
        match ev {
            PlaybackEvent::Started { generation } => {
                if self.playback.on_started(generation) == SinkOutcome::Stale {
                    self.telemetry.record(TelemetryEvent::StalePlaybackEvent);
                    return;
                }
                if self.machine.state() != TurnState::AiSpeaking
                    && !self.transition(TurnState::AiSpeaking, now, "audio_started")
                {
                    // Someone else owns the turn; the clip may not play over it.
                    self.playback.cancel();
                    effects.push(SideEffect::StopPlayback);
                }
            }
            PlaybackEvent::Ended { generation } => {
                if self.playback.on_ended(generation, now) == SinkOutcome::Stale {
                    self.telemetry.record(TelemetryEvent::StalePlaybackEvent);
                    return;
                }
                self.enter_speaking_if_needed(now, "audio_ended");
            }
            PlaybackEvent::Failed { generation, reason } => {
                self.clip_failed(generation, reason, now, effects);
            }
        }
    }

    /// A failed clip is treated as a zero-length clip that ended.
    fn clip_failed(&mut self, generation: u64, reason: String, now: Millis, effects: &mut Vec<SideEffect>) {
        if self.playback.on_failed(generation, now) == SinkOutcome::Stale {
            self.telemetry.record(TelemetryEvent::StalePlaybackEvent);
            return;
        }
        warn!(generation, %reason, "playback failed");
        effects.push(SideEffect::Notice(Notice::PlaybackFailed(reason)));
        self.enter_speaking_if_needed(now, "audio_failed");
    }

    fn enter_speaking_if_needed(&mut self, now: Millis, source: &str) {
        if self.machine.state() != TurnState::AiSpeaking {
            self.transition(TurnState::AiSpeaking, now, source);
        }
    }

    fn on_command(&mut self, cmd: UserCommand, now: Millis, effects: &mut Vec<SideEffect>) {
        match cmd {
            UserCommand::SubmitText(text) => self.submit_text(text, now, effects),
            UserCommand::SendNow => {
                if let Some(segment) = self.vad.flush_now(now) {
                    self.flush_segment(segment, now, effects);
                }
            }
            UserCommand::Interrupt => self.barge_in(now, InterruptSource::Explicit, effects),
            UserCommand::EndInterview => {
                if self.connection == ConnectionState::Closed {
                    return;
                }
                info!("candidate ended the interview");
                if self.connection == ConnectionState::Open {
                    effects.push(SideEffect::Send(ClientMessage::EndInterview));
                }
                effects.push(SideEffect::CloseConnection);
                self.teardown(now, CloseReason::EndedByCandidate, effects);
            }
        }
    }

    fn submit_text(&mut self, text: String, now: Millis, effects: &mut Vec<SideEffect>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.machine.state() != TurnState::Listening {
            warn!(state = %self.machine.state(), "typed answer outside the candidate's turn ignored");
            return;
        }
        if !self.transition(TurnState::Processing, now, "text_input") {
            return;
        }
        let utterance = self.transcript.add_candidate(text).clone();
        effects.push(SideEffect::Transcript(utterance));
        effects.push(SideEffect::Send(ClientMessage::TextInput(text.to_string())));
    }

    fn flush_segment(&mut self, segment: CapturedSegment, at: Millis, effects: &mut Vec<SideEffect>) {
        if self.machine.state() != TurnState::Listening {
            self.telemetry.record(TelemetryEvent::SegmentDropped {
                reason: DropReason::NotListening,
            });
            return;
        }
        let encoded = match segment.to_base64_wav() {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(segment = %segment.id, error = %err, "segment encode failed");
                self.telemetry.record(TelemetryEvent::SegmentDropped {
                    reason: DropReason::EncodeFailed,
                });
                return;
            }
        };
        if self.transition(TurnState::Processing, at, "speech_end") {
            self.telemetry.record(TelemetryEvent::SegmentFlushed {
                span_ms: segment.span_ms(),
                audio_ms: segment.audio_ms(),
            });
            effects.push(SideEffect::Send(ClientMessage::AudioData(encoded)));
        }
    }

    /// Barge-in: silence the AI, tell the backend, hand the turn over after
    /// a short settle.
    fn barge_in(&mut self, now: Millis, source: InterruptSource, effects: &mut Vec<SideEffect>) {
        if self.machine.state() != TurnState::AiSpeaking {
            debug!(?source, state = %self.machine.state(), "interrupt outside AI turn ignored");
            return;
        }
        if self.caption.clear_now() {
            effects.push(SideEffect::Caption(String::new()));
        }
        if self.playback.cancel() {
            effects.push(SideEffect::StopPlayback);
        }
        effects.push(SideEffect::Send(ClientMessage::Interrupt));

        let into_turn_ms = self
            .ai_turn_started_at
            .map(|start| elapsed(start, now))
            .unwrap_or_default();
        self.telemetry.record(TelemetryEvent::BargeIn {
            source,
            into_turn_ms,
        });

        if self.transition(TurnState::CandidateInterrupting, now, "barge_in") {
            self.interrupt_resume
                .arm(now, self.config.playback.interrupt_resume_ms);
        }
    }

    fn resume_listening(&mut self, at: Millis, source: &str, effects: &mut Vec<SideEffect>) {
        if self.session.as_ref().is_some_and(|s| s.wrapping_up) {
            self.complete_session(at, effects);
            return;
        }
        self.transition(TurnState::Listening, at, source);
    }

    fn complete_session(&mut self, at: Millis, effects: &mut Vec<SideEffect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.completed = true;
        info!(session = %session.id, "interview complete");
        effects.push(SideEffect::SessionComplete {
            session_id: session.id.clone(),
        });
        effects.push(SideEffect::CloseConnection);
        self.teardown(at, CloseReason::WrapUp, effects);
    }

    /// Drops all pending work and returns to IDLE. Runs once per connection.
    fn teardown(&mut self, at: Millis, reason: CloseReason, effects: &mut Vec<SideEffect>) {
        if self.connection == ConnectionState::Closed {
            return;
        }
        self.connection = ConnectionState::Closed;
        self.interrupt_resume.cancel();
        if self.playback.cancel() {
            effects.push(SideEffect::StopPlayback);
        }
        self.vad.abort();
        if self.caption.reset() {
            effects.push(SideEffect::Caption(String::new()));
        }
        self.machine.reset(at);
        self.telemetry.record(TelemetryEvent::TurnTransition {
            from: Origin::Reset,
            to: TurnState::Idle,
            at,
        });
        self.sync_components(at);
        self.ai_turn_started_at = None;
        self.last_session = self.session.take().or(self.last_session.take());
        self.telemetry.record(TelemetryEvent::SessionClosed { reason });
        effects.push(SideEffect::Connection(ConnectionState::Closed));
    }

    /// The one path through which the kernel changes turns.
    fn transition(
        &mut self,
        target: TurnState,
        at: Millis,
        source: &str,
    ) -> bool {
        let from = self.machine.state();
        match self.machine.transition(target, at, Metadata::source(source)) {
            Ok(()) => {
                self.telemetry.record(TelemetryEvent::TurnTransition {
                    from: Origin::State(from),
                    to: target,
                    at,
                });
                if target == TurnState::AiSpeaking {
                    self.ai_turn_started_at = Some(at);
                }
                self.sync_components(at);
                true
            }
            Err(err) => {
                self.telemetry.record(TelemetryEvent::TransitionRejected {
                    from: err.from,
                    to: err.to,
                });
                false
            }
        }
    }

    fn sync_components(&mut self, at: Millis) {
        let state = self.machine.state();
        if self.capture_available {
            self.vad.sync_mode(state, at);
        }
        self.caption.sync(state, at);
    }

    pub fn turn_state(&self) -> TurnState {
        self.machine.state()
    }

    pub fn state_machine(&self) -> &TurnStateMachine {
        &self.machine
    }

    /// Mutable access for observers (`subscribe`/`unsubscribe`).
    pub fn state_machine_mut(&mut self) -> &mut TurnStateMachine {
        &mut self.machine
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The session that was active when the connection last closed.
    pub fn last_session(&self) -> Option<&Session> {
        self.last_session.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn caption_line(&self) -> String {
        polish(&self.caption.line())
    }

    pub fn is_capturing(&self) -> bool {
        self.vad.is_capturing()
    }

    pub fn capture_available(&self) -> bool {
        self.capture_available
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    /// Releases observers and pending work. The reactor is inert afterwards.
    pub fn dispose(&mut self) {
        self.interrupt_resume.cancel();
        self.playback.cancel();
        self.vad.abort();
        self.caption.reset();
        self.machine.dispose();
        self.session = None;
    }
}

fn decode_clip(b64: &str) -> crate::error::InterviewResult<Vec<u8>> {
    use base64::Engine as _;
    Ok(base64::engine::general_purpose::STANDARD.decode(b64.trim())?)
}
