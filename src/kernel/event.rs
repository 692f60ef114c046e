use crate::kernel::audio::monitor::AudioFrame;
use crate::protocol::message::ServerMessage;

/// Everything the reactor reacts to. Timers are not events: the reactor
/// fires its own deadlines from the timestamp passed to each step.
#[derive(Debug, Clone)]
pub enum Event {
    /// Cadence only. Lets due timers fire when nothing else happens.
    Tick,
    Connection(ConnectionEvent),
    Server(ServerMessage),
    /// One analysis frame from the microphone.
    Audio(AudioFrame),
    /// The microphone could not be opened. Text input takes over.
    CaptureUnavailable(String),
    Playback(PlaybackEvent),
    Command(UserCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connecting,
    Opened,
    Closed { reason: Option<String> },
}

/// Sink lifecycle, tagged with the generation of the clip it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { generation: u64 },
    Ended { generation: u64 },
    Failed { generation: u64, reason: String },
}

/// Explicit actions from the candidate's side of the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Typed answer. Only accepted while listening.
    SubmitText(String),
    /// Flush the open capture without waiting for silence.
    SendNow,
    Interrupt,
    EndInterview,
}
