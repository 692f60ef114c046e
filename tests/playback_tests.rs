use voice_interview::config::PlaybackConfig;
use voice_interview::kernel::playback::{PlaybackController, SinkOutcome};

#[test]
fn test_superseded_clip_cannot_complete() {
    let mut playback = PlaybackController::new(PlaybackConfig::default());

    let (a, superseded) = playback.begin();
    assert!(!superseded);
    assert_eq!(playback.on_started(a.generation), SinkOutcome::Current);

    let (b, superseded) = playback.begin();
    assert!(superseded, "A was still active");
    assert_ne!(a.generation, b.generation);
    assert_eq!(playback.on_started(b.generation), SinkOutcome::Current);

    // A's late completion must not arm the dwell for B's turn.
    assert_eq!(playback.on_ended(a.generation, 1_000), SinkOutcome::Stale);
    assert!(playback.dwell_deadline().is_none());
    assert_eq!(playback.current(), Some(b));
    assert!(playback.is_playing());

    assert_eq!(playback.on_ended(b.generation, 2_000), SinkOutcome::Current);
    assert_eq!(playback.dwell_deadline(), Some(2_800));
    assert_eq!(playback.superseded_count(), 1);
}

#[test]
fn test_dwell_fires_once_after_natural_end() {
    let mut playback = PlaybackController::new(PlaybackConfig::default());
    let (clip, _) = playback.begin();
    playback.on_started(clip.generation);
    playback.on_ended(clip.generation, 5_000);

    assert!(playback.is_busy(), "dwell still pending");
    assert!(!playback.on_dwell(5_799));
    assert!(playback.on_dwell(5_800));
    assert!(!playback.on_dwell(6_000));
    assert!(!playback.is_busy());
}

#[test]
fn test_cancel_voids_dwell_and_late_events() {
    let mut playback = PlaybackController::new(PlaybackConfig::default());
    let (clip, _) = playback.begin();
    playback.on_started(clip.generation);
    playback.on_ended(clip.generation, 100);

    assert!(!playback.cancel(), "clip already finished");
    assert!(playback.dwell_deadline().is_none(), "cancel drops the dwell too");

    let (next, _) = playback.begin();
    assert!(playback.cancel());
    assert_eq!(playback.on_started(next.generation), SinkOutcome::Stale);
    assert_eq!(playback.on_failed(next.generation, 200), SinkOutcome::Stale);
    assert!(!playback.is_busy());
}

#[test]
fn test_failure_counts_as_zero_length_clip() {
    let mut playback = PlaybackController::new(PlaybackConfig::default());
    let (clip, _) = playback.begin();
    assert_eq!(playback.on_failed(clip.generation, 300), SinkOutcome::Current);
    assert_eq!(playback.dwell_deadline(), Some(1_100));
    assert!(playback.current().is_none());
}
