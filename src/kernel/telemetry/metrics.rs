use std::collections::VecDeque;

use super::event::{CloseReason, TelemetryEvent};
use crate::kernel::state::Origin;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub turn_stats: TurnStats,
    pub capture_stats: CaptureStats,
    pub interruption_stats: InterruptionStats,
    pub playback_stats: PlaybackStats,
    pub session_stats: SessionStats,
}

#[derive(Debug, Clone, Default)]
pub struct TurnStats {
    pub transitions: u64,
    pub rejected: u64,
    pub resets: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    pub segments_flushed: u64,
    pub segments_dropped: u64,
    pub total_audio_ms: u64,
    pub avg_audio_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct InterruptionStats {
    pub count: u64,
    pub total_into_turn_ms: u64,
    pub avg_into_turn_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackStats {
    pub stale_events: u64,
    pub superseded: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub wrapped_up: u64,
    pub ended_by_candidate: u64,
    pub connection_lost: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::TurnTransition { from, .. } => {
                if *from == Origin::Reset {
                    snap.turn_stats.resets += 1;
                } else {
                    snap.turn_stats.transitions += 1;
                }
            }
            TelemetryEvent::TransitionRejected { .. } => snap.turn_stats.rejected += 1,
            TelemetryEvent::SegmentFlushed { audio_ms, .. } => {
                snap.capture_stats.segments_flushed += 1;
                snap.capture_stats.total_audio_ms += audio_ms;
            }
            TelemetryEvent::SegmentDropped { .. } => snap.capture_stats.segments_dropped += 1,
            TelemetryEvent::BargeIn { into_turn_ms, .. } => {
                snap.interruption_stats.count += 1;
                snap.interruption_stats.total_into_turn_ms += into_turn_ms;
            }
            TelemetryEvent::StalePlaybackEvent => snap.playback_stats.stale_events += 1,
            TelemetryEvent::PlaybackSuperseded => snap.playback_stats.superseded += 1,
            TelemetryEvent::SessionClosed { reason } => match reason {
                CloseReason::WrapUp => snap.session_stats.wrapped_up += 1,
                CloseReason::EndedByCandidate => snap.session_stats.ended_by_candidate += 1,
                CloseReason::ConnectionLost => snap.session_stats.connection_lost += 1,
            },
        }
    }

    if snap.capture_stats.segments_flushed > 0 {
        snap.capture_stats.avg_audio_ms =
            snap.capture_stats.total_audio_ms as f64 / snap.capture_stats.segments_flushed as f64;
    }

    if snap.interruption_stats.count > 0 {
        snap.interruption_stats.avg_into_turn_ms = snap.interruption_stats.total_into_turn_ms
            as f64
            / snap.interruption_stats.count as f64;
    }

    snap
}
