//! Error types for the interview voice engine.

use thiserror::Error;

pub type InterviewResult<T> = Result<T, InterviewError>;

#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Audio encode error: {0}")]
    Encode(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InterviewError {
    /// Only a lost connection ends the session; everything else degrades a
    /// single pipeline and the interview carries on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, InterviewError::Connection(_))
    }
}

impl From<serde_json::Error> for InterviewError {
    fn from(err: serde_json::Error) -> Self {
        InterviewError::Protocol(err.to_string())
    }
}

impl From<base64::DecodeError> for InterviewError {
    fn from(err: base64::DecodeError) -> Self {
        InterviewError::Protocol(format!("base64: {}", err))
    }
}

impl From<hound::Error> for InterviewError {
    fn from(err: hound::Error) -> Self {
        InterviewError::Encode(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for InterviewError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        InterviewError::Connection(err.to_string())
    }
}

#[cfg(feature = "devices")]
impl From<cpal::DevicesError> for InterviewError {
    fn from(err: cpal::DevicesError) -> Self {
        InterviewError::AudioDevice(err.to_string())
    }
}

#[cfg(feature = "devices")]
impl From<cpal::DefaultStreamConfigError> for InterviewError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        InterviewError::AudioDevice(err.to_string())
    }
}

#[cfg(feature = "devices")]
impl From<cpal::SupportedStreamConfigsError> for InterviewError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        InterviewError::AudioDevice(err.to_string())
    }
}

#[cfg(feature = "devices")]
impl From<cpal::BuildStreamError> for InterviewError {
    fn from(err: cpal::BuildStreamError) -> Self {
        InterviewError::AudioDevice(err.to_string())
    }
}

#[cfg(feature = "devices")]
impl From<cpal::PlayStreamError> for InterviewError {
    fn from(err: cpal::PlayStreamError) -> Self {
        InterviewError::AudioDevice(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_errors_are_fatal() {
        assert!(InterviewError::AudioDevice("no mic".into()).is_recoverable());
        assert!(InterviewError::Playback("decode".into()).is_recoverable());
        assert!(InterviewError::Protocol("bad".into()).is_recoverable());
        assert!(!InterviewError::Connection("reset".into()).is_recoverable());
    }
}
