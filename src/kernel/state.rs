//! Turn-taking state machine.
//!
//! The machine is the single authority on whose turn it is. Components never
//! mutate it directly; they request a transition and the machine validates it
//! against a fixed table. A rejected request leaves the state untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use super::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    /// No session running. Initial state, and where `reset` lands.
    Idle,
    /// Candidate's turn: microphone captures utterances.
    Listening,
    /// Candidate's turn is over, waiting for the interviewer's reply.
    Processing,
    /// Interviewer audio is playing. Microphone only watches for barge-in.
    AiSpeaking,
    /// Candidate spoke over the interviewer.
    CandidateInterrupting,
}

impl Default for TurnState {
    fn default() -> Self {
        Self::Idle
    }
}

impl TurnState {
    pub const ALL: [TurnState; 5] = [
        TurnState::Idle,
        TurnState::Listening,
        TurnState::Processing,
        TurnState::AiSpeaking,
        TurnState::CandidateInterrupting,
    ];

    /// Targets reachable from this state through a validated transition.
    pub fn allowed_targets(self) -> &'static [TurnState] {
        use TurnState::*;
        match self {
            Idle => &[Listening],
            Listening => &[Processing, AiSpeaking],
            Processing => &[AiSpeaking],
            AiSpeaking => &[Listening, CandidateInterrupting],
            CandidateInterrupting => &[Listening],
        }
    }

    pub fn can_transition_to(self, target: TurnState) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TurnState::Idle => "IDLE",
            TurnState::Listening => "LISTENING",
            TurnState::Processing => "PROCESSING",
            TurnState::AiSpeaking => "AI_SPEAKING",
            TurnState::CandidateInterrupting => "CANDIDATE_INTERRUPTING",
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a transition came from. `Reset` is the synthetic marker used by
/// forced resets, so observers can tell recovery apart from normal flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    State(TurnState),
    Reset,
}

impl Origin {
    pub fn state(self) -> Option<TurnState> {
        match self {
            Origin::State(s) => Some(s),
            Origin::Reset => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::State(s) => fmt::Display::fmt(s, f),
            Origin::Reset => f.write_str("RESET"),
        }
    }
}

/// Free-form context attached to a transition (who asked for it, and why).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: Option<String>,
    pub detail: Option<String>,
}

impl Metadata {
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Origin,
    pub to: TurnState,
    pub at: Millis,
    pub metadata: Metadata,
}

impl Transition {
    pub fn is_reset(&self) -> bool {
        self.from == Origin::Reset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TurnState,
    pub to: TurnState,
}

/// Handle returned by `subscribe`; pass it back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&Transition) + Send>;

/// One instance per active session. Observers are notified synchronously,
/// in subscription order, after the state has been updated.
pub struct TurnStateMachine {
    current: TurnState,
    history: Vec<Transition>,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for TurnStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnStateMachine")
            .field("current", &self.current)
            .field("history", &self.history.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TurnStateMachine {
    pub fn new(now: Millis) -> Self {
        Self {
            current: TurnState::Idle,
            history: vec![Self::initial_record(now)],
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    fn initial_record(at: Millis) -> Transition {
        Transition {
            from: Origin::State(TurnState::Idle),
            to: TurnState::Idle,
            at,
            metadata: Metadata::default(),
        }
    }

    pub fn state(&self) -> TurnState {
        self.current
    }

    pub fn can_transition_to(&self, target: TurnState) -> bool {
        self.current.can_transition_to(target)
    }

    pub fn valid_next_states(&self) -> &'static [TurnState] {
        self.current.allowed_targets()
    }

    /// Validated transition. On rejection nothing changes and nobody is notified.
    pub fn transition(
        &mut self,
        target: TurnState,
        at: Millis,
        metadata: Metadata,
    ) -> Result<(), InvalidTransition> {
        let from = self.current;
        if !from.can_transition_to(target) {
            warn!(
                from = %from,
                to = %target,
                source = metadata.source.as_deref().unwrap_or("-"),
                "rejected turn transition"
            );
            return Err(InvalidTransition { from, to: target });
        }

        self.current = target;
        let record = Transition {
            from: Origin::State(from),
            to: target,
            at,
            metadata,
        };
        info!(
            from = %from,
            to = %target,
            source = record.metadata.source.as_deref().unwrap_or("-"),
            "turn transition"
        );
        self.history.push(record.clone());
        self.notify(&record);
        Ok(())
    }

    /// Forces `Idle`, bypassing the table. History collapses to one entry and
    /// observers get exactly one notification whose origin is `Origin::Reset`.
    pub fn reset(&mut self, at: Millis) {
        info!(from = %self.current, "turn state reset");
        self.current = TurnState::Idle;
        self.history = vec![Self::initial_record(at)];
        let record = Transition {
            from: Origin::Reset,
            to: TurnState::Idle,
            at,
            metadata: Metadata::source("reset"),
        };
        self.notify(&record);
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&Transition) + Send + 'static,
    {
        self.next_subscription += 1;
        let handle = Subscription(self.next_subscription);
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Returns false if the handle was already removed.
    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// The last `limit` records, oldest first.
    pub fn history(&self, limit: usize) -> &[Transition] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn full_history(&self) -> &[Transition] {
        &self.history
    }

    pub fn should_record_audio(&self) -> bool {
        self.current == TurnState::Listening
    }

    pub fn should_detect_interrupt(&self) -> bool {
        self.current == TurnState::AiSpeaking
    }

    pub fn is_ai_speaking(&self) -> bool {
        self.current == TurnState::AiSpeaking
    }

    /// Drops every observer and the history. The state reads `Idle` afterwards.
    pub fn dispose(&mut self) {
        self.listeners.clear();
        self.history.clear();
        self.current = TurnState::Idle;
    }

    fn notify(&mut self, record: &Transition) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(record);
        }
    }
}
