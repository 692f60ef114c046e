//! Wire messages. Every frame is a JSON envelope `{ "type", "payload" }`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{InterviewError, InterviewResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Messages from the interview backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Session confirmed. The payload is a status note; an id is taken only
    /// from an explicit `{"session_id": ...}` object.
    SessionCreated { session_id: Option<String> },
    /// Incremental interviewer text.
    TextChunk(String),
    /// Base64 synthesized clip for the interviewer's turn.
    AudioOutput(String),
    /// Final text of the candidate's last utterance.
    Transcription(String),
    /// Final evaluation; only its arrival matters here.
    Report(Value),
    /// Backend finished streaming the current reply.
    ResponseComplete,
    Error(String),
    Unknown(String),
}

impl ServerMessage {
    pub fn decode(text: &str) -> InterviewResult<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> InterviewResult<Self> {
        let Envelope { kind, payload } = envelope;
        let message = match kind.as_str() {
            "session_created" => ServerMessage::SessionCreated {
                session_id: payload
                    .get("session_id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_owned),
            },
            "text_chunk" => ServerMessage::TextChunk(text_payload(&kind, payload)?),
            "audio_output" => ServerMessage::AudioOutput(text_payload(&kind, payload)?),
            "transcription" => ServerMessage::Transcription(text_payload(&kind, payload)?),
            "report" => ServerMessage::Report(payload),
            "response_complete" => ServerMessage::ResponseComplete,
            "error" => ServerMessage::Error(match payload {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            _ => ServerMessage::Unknown(kind),
        };
        Ok(message)
    }

    pub fn kind(&self) -> &str {
        match self {
            ServerMessage::SessionCreated { .. } => "session_created",
            ServerMessage::TextChunk(_) => "text_chunk",
            ServerMessage::AudioOutput(_) => "audio_output",
            ServerMessage::Transcription(_) => "transcription",
            ServerMessage::Report(_) => "report",
            ServerMessage::ResponseComplete => "response_complete",
            ServerMessage::Error(_) => "error",
            ServerMessage::Unknown(kind) => kind,
        }
    }
}

fn text_payload(kind: &str, payload: Value) -> InterviewResult<String> {
    match payload {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(InterviewError::Protocol(format!(
            "{} expects a string payload, got {}",
            kind, other
        ))),
    }
}

/// Messages to the interview backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    StartInterview {
        candidate_name: String,
        job_role: String,
    },
    /// Base64 WAV of one captured utterance.
    AudioData(String),
    /// Typed answer, used when the microphone is unavailable.
    TextInput(String),
    Interrupt,
    EndInterview,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::StartInterview { .. } => "start_interview",
            ClientMessage::AudioData(_) => "audio_data",
            ClientMessage::TextInput(_) => "text_input",
            ClientMessage::Interrupt => "interrupt",
            ClientMessage::EndInterview => "end_interview",
        }
    }

    pub fn to_envelope(&self) -> Envelope {
        let payload = match self {
            ClientMessage::StartInterview {
                candidate_name,
                job_role,
            } => json!({ "candidate_name": candidate_name, "job_role": job_role }),
            ClientMessage::AudioData(b64) => Value::String(b64.clone()),
            ClientMessage::TextInput(text) => Value::String(text.clone()),
            ClientMessage::Interrupt | ClientMessage::EndInterview => json!({}),
        };
        Envelope {
            kind: self.kind().to_string(),
            payload,
        }
    }

    pub fn encode(&self) -> InterviewResult<String> {
        Ok(serde_json::to_string(&self.to_envelope())?)
    }
}
