use serde::{Deserialize, Serialize};

use crate::kernel::state::{Origin, TurnState};
use crate::kernel::time::Millis;

// Allowed: states, timestamps, durations, counts, enums.
// Forbidden: transcript text, audio samples, report contents.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    TurnTransition {
        from: Origin,
        to: TurnState,
        at: Millis,
    },

    TransitionRejected {
        from: TurnState,
        to: TurnState,
    },

    SegmentFlushed {
        span_ms: Millis,
        audio_ms: Millis,
    },

    SegmentDropped {
        reason: DropReason,
    },

    BargeIn {
        source: InterruptSource,
        /// Time from the start of the AI turn to the interrupt.
        into_turn_ms: Millis,
    },

    StalePlaybackEvent,

    PlaybackSuperseded,

    SessionClosed {
        reason: CloseReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    NotListening,
    EncodeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptSource {
    VoiceActivity,
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    WrapUp,
    EndedByCandidate,
    ConnectionLost,
}
