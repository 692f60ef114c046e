use voice_interview::config::VadConfig;
use voice_interview::kernel::audio::monitor::{
    AudioFrame, DetectorMode, VadSignal, VoiceActivityDetector,
};
use voice_interview::kernel::audio::segment::{CapturedSegment, SegmentStatus};
use voice_interview::kernel::state::TurnState;
use voice_interview::kernel::time::{Millis, TICK_MS};

const QUIET: f32 = 2.0;
const SPEECH: f32 = 20.0;
const SHOUT: f32 = 45.0;

fn detector_in(state: TurnState, at: Millis) -> VoiceActivityDetector {
    let mut vad = VoiceActivityDetector::new(VadConfig::default(), 16_000);
    vad.sync_mode(state, at);
    vad
}

/// Runs a loudness trace at tick cadence, firing the silence timer before
/// each frame the way the reactor does. Returns every flushed segment.
fn run_capture_trace(
    vad: &mut VoiceActivityDetector,
    until: Millis,
    loudness_at: impl Fn(Millis) -> f32,
) -> Vec<CapturedSegment> {
    let mut flushed = Vec::new();
    let mut t = 0;
    while t <= until {
        if let Some(segment) = vad.on_silence_timeout(t) {
            flushed.push(segment);
        }
        vad.process(&AudioFrame::new(loudness_at(t), vec![0.1; 256]), t);
        t += TICK_MS;
    }
    flushed
}

#[test]
fn test_one_segment_per_utterance() {
    let mut vad = detector_in(TurnState::Listening, 0);

    // Speech on ticks 112..=496, silence afterwards.
    let segments = run_capture_trace(&mut vad, 5_000, |t| {
        if (100..=500).contains(&t) {
            SPEECH
        } else {
            QUIET
        }
    });

    assert_eq!(segments.len(), 1, "exactly one flush");
    let segment = &segments[0];
    assert_eq!(segment.started_at, 112, "onset is the first loud tick");
    assert_eq!(
        segment.ended_at,
        Some(496 + 2_000),
        "offset is where the 2000 ms silence timer elapses"
    );
    assert_eq!(segment.status, SegmentStatus::Flushed);
    assert!(!segment.samples.is_empty());
    assert!(!vad.is_capturing());
}

#[test]
fn test_speech_inside_silence_window_rearms_timer() {
    let mut vad = detector_in(TurnState::Listening, 0);

    // A blip at 1_904 lands inside the first silence window (ends 2_096).
    let segments = run_capture_trace(&mut vad, 6_000, |t| match t {
        96 => SPEECH,
        1_904 => SPEECH,
        _ => QUIET,
    });

    assert_eq!(segments.len(), 1, "the blip extends the same utterance");
    assert_eq!(segments[0].started_at, 96);
    assert_eq!(segments[0].ended_at, Some(1_904 + 2_000));
}

#[test]
fn test_silence_alone_never_flushes() {
    let mut vad = detector_in(TurnState::Listening, 0);
    let segments = run_capture_trace(&mut vad, 10_000, |_| QUIET);
    assert!(segments.is_empty());
    assert!(vad.silence_deadline().is_none());
}

#[test]
fn test_threshold_is_strict() {
    let mut vad = detector_in(TurnState::Listening, 0);
    assert_eq!(vad.process(&AudioFrame::level(8.0), 0), None);
    assert!(!vad.is_capturing());
    assert_eq!(
        vad.process(&AudioFrame::level(8.01), 16),
        Some(VadSignal::SpeechStart)
    );
    assert!(vad.is_capturing());
}

#[test]
fn test_leaving_listening_discards_partial_capture() {
    let mut vad = detector_in(TurnState::Listening, 0);
    vad.process(&AudioFrame::level(SPEECH), 0);
    assert!(vad.is_capturing());

    vad.sync_mode(TurnState::AiSpeaking, 100);
    assert!(!vad.is_capturing());
    assert!(vad.silence_deadline().is_none(), "silence timer cancelled");
    assert!(vad.on_silence_timeout(10_000).is_none());
    assert_eq!(vad.mode(), DetectorMode::InterruptWatch);
}

#[test]
fn test_manual_flush_closes_immediately() {
    let mut vad = detector_in(TurnState::Listening, 0);
    vad.process(&AudioFrame::level(SPEECH), 32);

    let segment = vad.flush_now(400).expect("open capture is flushed");
    assert_eq!(segment.started_at, 32);
    assert_eq!(segment.ended_at, Some(400));
    assert!(vad.silence_deadline().is_none());
    assert!(vad.flush_now(500).is_none(), "nothing left to flush");
}

#[test]
fn test_interrupt_grace_boundary() {
    // Entering AI_SPEAKING at t=0.
    let mut early = detector_in(TurnState::AiSpeaking, 0);
    assert_eq!(early.process(&AudioFrame::level(SHOUT), 999), None);
    assert_eq!(early.process(&AudioFrame::level(SHOUT), 1_000), None);

    let mut late = detector_in(TurnState::AiSpeaking, 0);
    assert_eq!(
        late.process(&AudioFrame::level(SHOUT), 1_001),
        Some(VadSignal::BargeIn)
    );
}

#[test]
fn test_barge_in_fires_once_per_turn() {
    let mut vad = detector_in(TurnState::AiSpeaking, 0);
    let signals: Vec<_> = (1_100..1_500)
        .step_by(TICK_MS as usize)
        .filter_map(|t| vad.process(&AudioFrame::level(SHOUT), t))
        .collect();
    assert_eq!(signals, vec![VadSignal::BargeIn]);

    // A new AI turn re-opens the grace window.
    vad.sync_mode(TurnState::Listening, 2_000);
    vad.sync_mode(TurnState::AiSpeaking, 3_000);
    assert_eq!(vad.process(&AudioFrame::level(SHOUT), 3_500), None);
    assert_eq!(
        vad.process(&AudioFrame::level(SHOUT), 4_001),
        Some(VadSignal::BargeIn)
    );
}

#[test]
fn test_interrupt_threshold_is_higher_than_capture() {
    let mut vad = detector_in(TurnState::AiSpeaking, 0);
    // Loud enough to capture, not loud enough to interrupt.
    assert_eq!(vad.process(&AudioFrame::level(SPEECH), 2_000), None);
    assert_eq!(vad.process(&AudioFrame::level(30.0), 2_016), None);
}

#[test]
fn test_dormant_states_ignore_audio() {
    for state in [
        TurnState::Idle,
        TurnState::Processing,
        TurnState::CandidateInterrupting,
    ] {
        let mut vad = detector_in(state, 0);
        assert_eq!(vad.mode(), DetectorMode::Dormant);
        assert_eq!(vad.process(&AudioFrame::level(SHOUT), 5_000), None);
        assert!(!vad.is_capturing());
    }
}

#[test]
fn test_flushed_segment_encodes_as_wav() {
    let mut vad = detector_in(TurnState::Listening, 0);
    vad.process(&AudioFrame::new(SPEECH, vec![0.25; 1_600]), 0);
    let segment = vad.flush_now(100).unwrap();

    let wav = segment.to_wav().unwrap();
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(segment.audio_ms(), 100);
    assert!(!segment.to_base64_wav().unwrap().is_empty());
}
