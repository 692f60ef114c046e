use crate::kernel::session::ConnectionState;
use crate::kernel::transcript::Utterance;
use crate::protocol::message::ClientMessage;

/// Work the driver performs on behalf of the reactor. The reactor itself
/// never touches a socket, a device or the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Send(ClientMessage),
    /// Decoded clip bytes, to be played and reported back under `generation`.
    StartPlayback { generation: u64, clip: Vec<u8> },
    StopPlayback,
    /// Replaces the caption line. Empty string clears it.
    Caption(String),
    Transcript(Utterance),
    Connection(ConnectionState),
    Notice(Notice),
    CloseConnection,
    SessionComplete { session_id: String },
}

/// User-visible conditions that do not change the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CaptureUnavailable(String),
    PlaybackFailed(String),
    ServerError(String),
}
