use std::sync::{Arc, Mutex};

use voice_interview::kernel::state::{Metadata, Origin, Transition, TurnState, TurnStateMachine};

/// Drives a fresh machine into `target` through valid hops only.
fn machine_in(target: TurnState) -> TurnStateMachine {
    let mut machine = TurnStateMachine::new(0);
    let path: &[TurnState] = match target {
        TurnState::Idle => &[],
        TurnState::Listening => &[TurnState::Listening],
        TurnState::Processing => &[TurnState::Listening, TurnState::Processing],
        TurnState::AiSpeaking => &[TurnState::Listening, TurnState::AiSpeaking],
        TurnState::CandidateInterrupting => &[
            TurnState::Listening,
            TurnState::AiSpeaking,
            TurnState::CandidateInterrupting,
        ],
    };
    for (i, &hop) in path.iter().enumerate() {
        machine
            .transition(hop, i as u64 + 1, Metadata::source("test"))
            .unwrap();
    }
    assert_eq!(machine.state(), target);
    machine
}

#[test]
fn test_transition_table_is_exhaustive() {
    let allowed = |from: TurnState, to: TurnState| {
        use TurnState::*;
        matches!(
            (from, to),
            (Idle, Listening)
                | (Listening, Processing)
                | (Listening, AiSpeaking)
                | (Processing, AiSpeaking)
                | (AiSpeaking, Listening)
                | (AiSpeaking, CandidateInterrupting)
                | (CandidateInterrupting, Listening)
        )
    };

    for from in TurnState::ALL {
        for to in TurnState::ALL {
            let mut machine = machine_in(from);
            let history_before = machine.full_history().len();
            let result = machine.transition(to, 100, Metadata::source("table"));

            if allowed(from, to) {
                assert!(result.is_ok(), "{from} -> {to} should be accepted");
                assert_eq!(machine.state(), to);
                assert_eq!(machine.full_history().len(), history_before + 1);
            } else {
                let err = result.expect_err("transition should be rejected");
                assert_eq!((err.from, err.to), (from, to));
                assert_eq!(machine.state(), from, "rejected transition must not move state");
                assert_eq!(machine.full_history().len(), history_before);
            }
            assert_eq!(machine.can_transition_to(to), allowed(from, to));
        }
    }
}

#[test]
fn test_rejected_transition_notifies_nobody() {
    let mut machine = TurnStateMachine::new(0);
    let calls = Arc::new(Mutex::new(0));
    let seen = calls.clone();
    machine.subscribe(move |_| *seen.lock().unwrap() += 1);

    assert!(machine
        .transition(TurnState::AiSpeaking, 5, Metadata::default())
        .is_err());
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn test_reset_from_every_state_yields_one_marked_notification() {
    for from in TurnState::ALL {
        let mut machine = machine_in(from);
        let seen: Arc<Mutex<Vec<Transition>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        machine.subscribe(move |t| sink.lock().unwrap().push(t.clone()));

        machine.reset(500);

        assert_eq!(machine.state(), TurnState::Idle);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "reset from {from} must notify exactly once");
        assert_eq!(seen[0].from, Origin::Reset);
        assert!(seen[0].is_reset());
        assert_eq!(seen[0].to, TurnState::Idle);
        assert_eq!(seen[0].at, 500);
        assert_eq!(machine.full_history().len(), 1, "history collapses on reset");
    }
}

#[test]
fn test_subscribers_run_in_order_after_state_update() {
    let mut machine = TurnStateMachine::new(0);
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
        let log = log.clone();
        machine.subscribe(move |t| {
            log.lock().unwrap().push(format!("{name}:{}->{}", t.from, t.to));
        });
    }

    machine
        .transition(TurnState::Listening, 10, Metadata::source("session_created"))
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "first:IDLE->LISTENING",
            "second:IDLE->LISTENING",
            "third:IDLE->LISTENING",
        ]
    );
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let mut machine = TurnStateMachine::new(0);
    let calls = Arc::new(Mutex::new(0));
    let seen = calls.clone();
    let handle = machine.subscribe(move |_| *seen.lock().unwrap() += 1);

    machine
        .transition(TurnState::Listening, 1, Metadata::default())
        .unwrap();
    assert!(machine.unsubscribe(handle));
    assert!(!machine.unsubscribe(handle), "second unsubscribe is a no-op");
    machine
        .transition(TurnState::Processing, 2, Metadata::default())
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(machine.subscriber_count(), 0);
}

#[test]
fn test_history_keeps_source_metadata_and_limits() {
    let mut machine = machine_in(TurnState::CandidateInterrupting);
    machine
        .transition(TurnState::Listening, 50, Metadata::source("interrupt_resume"))
        .unwrap();

    let last_two = machine.history(2);
    assert_eq!(last_two.len(), 2);
    assert_eq!(last_two[0].to, TurnState::CandidateInterrupting);
    assert_eq!(last_two[1].to, TurnState::Listening);
    assert_eq!(
        last_two[1].metadata.source.as_deref(),
        Some("interrupt_resume")
    );
    assert_eq!(machine.history(100).len(), machine.full_history().len());
}

#[test]
fn test_role_helpers_follow_state() {
    let listening = machine_in(TurnState::Listening);
    assert!(listening.should_record_audio());
    assert!(!listening.should_detect_interrupt());

    let speaking = machine_in(TurnState::AiSpeaking);
    assert!(speaking.is_ai_speaking());
    assert!(speaking.should_detect_interrupt());
    assert!(!speaking.should_record_audio());
    assert_eq!(
        speaking.valid_next_states(),
        &[TurnState::Listening, TurnState::CandidateInterrupting]
    );
}

#[test]
fn test_dispose_drops_subscribers() {
    let mut machine = machine_in(TurnState::AiSpeaking);
    let calls = Arc::new(Mutex::new(0));
    let seen = calls.clone();
    machine.subscribe(move |_| *seen.lock().unwrap() += 1);

    machine.dispose();
    assert_eq!(machine.state(), TurnState::Idle);
    assert_eq!(machine.subscriber_count(), 0);

    machine.reset(10);
    assert_eq!(*calls.lock().unwrap(), 0);
}
