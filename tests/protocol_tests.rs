use serde_json::{json, Value};

use voice_interview::error::InterviewError;
use voice_interview::protocol::message::{ClientMessage, ServerMessage};

#[test]
fn test_inbound_messages_decode() {
    let cases = [
        (
            r#"{"type":"session_created","payload":{}}"#,
            ServerMessage::SessionCreated { session_id: None },
        ),
        (
            r#"{"type":"session_created","payload":{"session_id":"abc-123"}}"#,
            ServerMessage::SessionCreated {
                session_id: Some("abc-123".into()),
            },
        ),
        (
            r#"{"type":"text_chunk","payload":"Tell "}"#,
            ServerMessage::TextChunk("Tell ".into()),
        ),
        (
            r#"{"type":"audio_output","payload":"UklGRg=="}"#,
            ServerMessage::AudioOutput("UklGRg==".into()),
        ),
        (
            r#"{"type":"transcription","payload":"I built a compiler"}"#,
            ServerMessage::Transcription("I built a compiler".into()),
        ),
        (
            r#"{"type":"response_complete"}"#,
            ServerMessage::ResponseComplete,
        ),
        (
            r#"{"type":"error","payload":"LLM timeout"}"#,
            ServerMessage::Error("LLM timeout".into()),
        ),
    ];

    for (raw, expected) in cases {
        assert_eq!(ServerMessage::decode(raw).unwrap(), expected, "decoding {raw}");
    }
}

#[test]
fn test_session_created_status_text_is_not_an_id() {
    let raw = r#"{"type":"session_created","payload":"Session connected securely."}"#;
    assert_eq!(
        ServerMessage::decode(raw).unwrap(),
        ServerMessage::SessionCreated { session_id: None }
    );

    let empty_id = r#"{"type":"session_created","payload":{"session_id":""}}"#;
    assert_eq!(
        ServerMessage::decode(empty_id).unwrap(),
        ServerMessage::SessionCreated { session_id: None }
    );
}

#[test]
fn test_report_payload_is_kept_opaque() {
    let raw = r#"{"type":"report","payload":{"score":7,"notes":["clear","concise"]}}"#;
    match ServerMessage::decode(raw).unwrap() {
        ServerMessage::Report(payload) => {
            assert_eq!(payload["score"], 7);
            assert_eq!(payload["notes"][1], "concise");
        }
        other => panic!("expected report, got {other:?}"),
    }
}

#[test]
fn test_unknown_type_is_not_an_error() {
    let message = ServerMessage::decode(r#"{"type":"heartbeat","payload":1}"#).unwrap();
    assert_eq!(message, ServerMessage::Unknown("heartbeat".into()));
    assert_eq!(message.kind(), "heartbeat");
}

#[test]
fn test_malformed_frames_are_protocol_errors() {
    let not_json = ServerMessage::decode("{nope").unwrap_err();
    assert!(matches!(not_json, InterviewError::Protocol(_)));
    assert!(not_json.is_recoverable());

    let missing_type = ServerMessage::decode(r#"{"payload":"x"}"#).unwrap_err();
    assert!(matches!(missing_type, InterviewError::Protocol(_)));

    let wrong_payload = ServerMessage::decode(r#"{"type":"text_chunk","payload":{"a":1}}"#)
        .unwrap_err();
    assert!(matches!(wrong_payload, InterviewError::Protocol(_)));
}

#[test]
fn test_outbound_envelopes() {
    let encode = |m: ClientMessage| -> Value { serde_json::from_str(&m.encode().unwrap()).unwrap() };

    assert_eq!(
        encode(ClientMessage::StartInterview {
            candidate_name: "Ada".into(),
            job_role: "Backend Engineer".into(),
        }),
        json!({
            "type": "start_interview",
            "payload": { "candidate_name": "Ada", "job_role": "Backend Engineer" }
        })
    );
    assert_eq!(
        encode(ClientMessage::AudioData("UklGRg==".into())),
        json!({ "type": "audio_data", "payload": "UklGRg==" })
    );
    assert_eq!(
        encode(ClientMessage::TextInput("hello".into())),
        json!({ "type": "text_input", "payload": "hello" })
    );
    assert_eq!(
        encode(ClientMessage::Interrupt),
        json!({ "type": "interrupt", "payload": {} })
    );
    assert_eq!(
        encode(ClientMessage::EndInterview),
        json!({ "type": "end_interview", "payload": {} })
    );
}
