//! Playback handle bookkeeping.
//!
//! The controller never touches an audio device. It hands out generations,
//! and the sink reports lifecycle events tagged with the generation they
//! belong to. Anything tagged with a superseded generation is dropped, so a
//! late "ended" from a cancelled clip can never drive the turn state.

use tracing::{debug, info};

use crate::config::PlaybackConfig;
use crate::kernel::time::Millis;
use crate::kernel::timer::Deadline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle {
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipPhase {
    Pending,
    Playing,
}

#[derive(Debug, Clone, Copy)]
struct ActiveClip {
    handle: PlaybackHandle,
    phase: ClipPhase,
}

/// Result of feeding a sink event to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOutcome {
    /// The event belongs to the current clip and was applied.
    Current,
    /// The event belongs to a clip that has since been replaced or cancelled.
    Stale,
}

pub struct PlaybackController {
    config: PlaybackConfig,
    generation: u64,
    active: Option<ActiveClip>,
    dwell: Deadline,
    superseded: u64,
}

impl PlaybackController {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            generation: 0,
            active: None,
            dwell: Deadline::new(),
            superseded: 0,
        }
    }

    /// Opens a new handle. Any previous clip is invalidated first.
    /// Returns the handle and whether a previous clip had to be superseded.
    pub fn begin(&mut self) -> (PlaybackHandle, bool) {
        let superseded = self.invalidate();
        if superseded {
            self.superseded += 1;
        }
        let handle = PlaybackHandle {
            generation: self.generation,
        };
        self.active = Some(ActiveClip {
            handle,
            phase: ClipPhase::Pending,
        });
        debug!(generation = handle.generation, superseded, "playback handle opened");
        (handle, superseded)
    }

    /// Cancels the current clip and any pending dwell. Returns true if a clip
    /// was active (the sink should be told to stop).
    pub fn cancel(&mut self) -> bool {
        let was_active = self.invalidate();
        if was_active {
            info!("playback cancelled");
        }
        was_active
    }

    fn invalidate(&mut self) -> bool {
        let was_active = self.active.take().is_some();
        self.dwell.cancel();
        self.generation += 1;
        was_active
    }

    fn is_current(&self, generation: u64) -> bool {
        matches!(self.active, Some(clip) if clip.handle.generation == generation)
    }

    pub fn on_started(&mut self, generation: u64) -> SinkOutcome {
        if !self.is_current(generation) {
            debug!(generation, "stale playback start ignored");
            return SinkOutcome::Stale;
        }
        if let Some(clip) = self.active.as_mut() {
            clip.phase = ClipPhase::Playing;
        }
        SinkOutcome::Current
    }

    /// Natural end of the current clip starts the anti-echo dwell.
    pub fn on_ended(&mut self, generation: u64, now: Millis) -> SinkOutcome {
        if !self.is_current(generation) {
            debug!(generation, "stale playback end ignored");
            return SinkOutcome::Stale;
        }
        self.active = None;
        self.dwell.arm(now, self.config.dwell_ms);
        debug!(generation, dwell_ms = self.config.dwell_ms, "clip ended, dwelling");
        SinkOutcome::Current
    }

    /// A clip that could not start counts as a zero-length clip that ended.
    pub fn on_failed(&mut self, generation: u64, now: Millis) -> SinkOutcome {
        self.on_ended(generation, now)
    }

    pub fn dwell_deadline(&self) -> Option<Millis> {
        self.dwell.due()
    }

    /// Dwell fire. True means the turn may go back to the candidate.
    pub fn on_dwell(&mut self, now: Millis) -> bool {
        self.dwell.poll(now).is_some()
    }

    pub fn current(&self) -> Option<PlaybackHandle> {
        self.active.map(|clip| clip.handle)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.active, Some(clip) if clip.phase == ClipPhase::Playing)
    }

    /// A clip is pending/playing or its dwell has not elapsed yet.
    pub fn is_busy(&self) -> bool {
        self.active.is_some() || self.dwell.is_armed()
    }

    pub fn superseded_count(&self) -> u64 {
        self.superseded
    }
}
