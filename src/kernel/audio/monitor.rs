use tracing::{debug, info};

use super::segment::CapturedSegment;
use crate::config::VadConfig;
use crate::kernel::state::TurnState;
use crate::kernel::time::{elapsed, Millis};
use crate::kernel::timer::Deadline;

/// What the microphone is being used for. Chosen purely from the turn state,
/// so capture and barge-in watching can never run at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorMode {
    Dormant,
    /// Candidate's turn: open a capture on speech, close it after a real pause.
    Capture,
    /// AI turn: loud, sustained speech past the grace window is a barge-in.
    InterruptWatch,
}

impl DetectorMode {
    pub fn for_state(state: TurnState) -> Self {
        match state {
            TurnState::Listening => DetectorMode::Capture,
            TurnState::AiSpeaking => DetectorMode::InterruptWatch,
            _ => DetectorMode::Dormant,
        }
    }
}

/// One sampling tick of microphone input.
#[derive(Debug, Clone, Default)]
pub struct AudioFrame {
    /// 0-100, see `level`.
    pub loudness: f32,
    pub samples: Vec<f32>,
}

impl AudioFrame {
    pub fn new(loudness: f32, samples: Vec<f32>) -> Self {
        Self { loudness, samples }
    }

    /// Frame with no sample payload, for level-only sources.
    pub fn level(loudness: f32) -> Self {
        Self {
            loudness,
            samples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VadSignal {
    /// Speech onset while listening; a capture is now open.
    SpeechStart,
    /// Candidate spoke over the AI past the grace window.
    BargeIn,
}

/// Energy-based voice activity detector driving both microphone modes.
pub struct VoiceActivityDetector {
    config: VadConfig,
    sample_rate: u32,
    mode: DetectorMode,

    // Capture mode
    capture: Option<CapturedSegment>,
    silence: Deadline,

    // Interrupt-watch mode
    watch_started_at: Option<Millis>,
    barge_in_signalled: bool,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
            mode: DetectorMode::Dormant,
            capture: None,
            silence: Deadline::new(),
            watch_started_at: None,
            barge_in_signalled: false,
        }
    }

    pub fn mode(&self) -> DetectorMode {
        self.mode
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn silence_deadline(&self) -> Option<Millis> {
        self.silence.due()
    }

    /// Re-selects the mode after a turn change. Leaving capture abandons the
    /// open segment and its silence timer; entering interrupt watch starts
    /// the grace window at `now`.
    pub fn sync_mode(&mut self, state: TurnState, now: Millis) {
        let next = DetectorMode::for_state(state);
        if next == self.mode {
            return;
        }
        debug!(from = ?self.mode, to = ?next, "vad mode change");

        if self.mode == DetectorMode::Capture {
            self.discard_capture();
        }
        match next {
            DetectorMode::InterruptWatch => {
                self.watch_started_at = Some(now);
                self.barge_in_signalled = false;
            }
            _ => {
                self.watch_started_at = None;
                self.barge_in_signalled = false;
            }
        }
        self.mode = next;
    }

    /// Feeds one frame. Returns a signal on speech onset or barge-in.
    pub fn process(&mut self, frame: &AudioFrame, now: Millis) -> Option<VadSignal> {
        match self.mode {
            DetectorMode::Dormant => None,
            DetectorMode::Capture => self.process_capture(frame, now),
            DetectorMode::InterruptWatch => self.process_watch(frame, now),
        }
    }

    fn process_capture(&mut self, frame: &AudioFrame, now: Millis) -> Option<VadSignal> {
        let mut signal = None;

        if frame.loudness > self.config.capture_threshold {
            if self.capture.is_none() {
                info!(loudness = frame.loudness, "speech start");
                self.capture = Some(CapturedSegment::new(now, self.sample_rate));
                signal = Some(VadSignal::SpeechStart);
            }
            // Any speech frame pushes the end of the utterance out again.
            self.silence.arm(now, self.config.silence_duration_ms);
        }

        if let Some(segment) = self.capture.as_mut() {
            segment.push(&frame.samples);
        }
        signal
    }

    fn process_watch(&mut self, frame: &AudioFrame, now: Millis) -> Option<VadSignal> {
        if self.barge_in_signalled || frame.loudness <= self.config.interrupt_threshold {
            return None;
        }
        let started = self.watch_started_at?;
        if elapsed(started, now) <= self.config.interrupt_grace_ms {
            debug!(loudness = frame.loudness, "loud frame inside grace window ignored");
            return None;
        }
        info!(loudness = frame.loudness, "barge-in detected");
        self.barge_in_signalled = true;
        Some(VadSignal::BargeIn)
    }

    /// Silence timer fire. Closes and returns the open segment.
    pub fn on_silence_timeout(&mut self, now: Millis) -> Option<CapturedSegment> {
        let at = self.silence.poll(now)?;
        self.close_capture(at)
    }

    /// Ends an open capture immediately (manual send).
    pub fn flush_now(&mut self, now: Millis) -> Option<CapturedSegment> {
        self.silence.cancel();
        self.close_capture(now)
    }

    fn close_capture(&mut self, at: Millis) -> Option<CapturedSegment> {
        let mut segment = self.capture.take()?;
        segment.close(at);
        info!(
            segment = %segment.id,
            span_ms = segment.span_ms(),
            "speech end"
        );
        Some(segment)
    }

    fn discard_capture(&mut self) {
        self.silence.cancel();
        if let Some(mut segment) = self.capture.take() {
            debug!(segment = %segment.id, "partial capture discarded");
            segment.discard();
        }
    }

    /// Drops all pending work, as on disconnect.
    pub fn abort(&mut self) {
        self.discard_capture();
        self.mode = DetectorMode::Dormant;
        self.watch_started_at = None;
        self.barge_in_signalled = false;
    }
}
