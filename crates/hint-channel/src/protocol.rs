//! Frame types spoken over the hint-service websocket.
//!
//! Outbound frames are `{"type": ..., "content": ...}` envelopes; inbound
//! frames carry their payload fields next to the `"type"` tag. Inbound
//! parsing never fails: anything unrecognized is folded into an
//! [`InboundMessage::Error`] so it still reaches the session feed.

use serde::{Deserialize, Serialize};

/// Language of the candidate's code buffer, as written on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    Javascript,
    Rust,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Javascript => write!(f, "javascript"),
            Language::Rust => write!(f, "rust"),
        }
    }
}

/// Client-to-service frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum OutboundMessage {
    /// The interview problem the candidate is working on.
    #[serde(rename = "problem_description")]
    ProblemDescription(String),
    /// The candidate's verbal plan of attack.
    #[serde(rename = "explanation")]
    Explanation(String),
    /// Code handed over for analysis.
    #[serde(rename = "code_submission")]
    CodeSubmission { code: String, language: Language },
    /// Free-form chat from the candidate.
    #[serde(rename = "message")]
    Chat(String),
    /// Snapshot of the session sent when the candidate has gone quiet.
    #[serde(rename = "silence_trigger")]
    SilenceTrigger {
        transcript: String,
        problem: String,
        code: String,
    },
    /// Asks the service to wrap up and produce a summary. The braces keep an
    /// empty `"content": {}` object on the wire.
    #[serde(rename = "end_session")]
    EndSession {},
}

/// Service-to-client frames. Timestamps are opaque service-local strings and
/// are passed through untouched; frames synthesized on the client side carry
/// none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Connection-level notices, e.g. the greeting after the handshake.
    #[serde(rename = "system")]
    System {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Conversational coaching, spoken aloud on arrival.
    #[serde(rename = "ai_response")]
    AiResponse {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Structured review of a code submission.
    #[serde(rename = "code_analysis")]
    CodeAnalysis {
        analysis: CodeAnalysis,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Final wrap-up of the whole session.
    #[serde(rename = "session_summary")]
    SessionSummary {
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Service-reported failure, or a frame this client could not parse.
    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

/// Payload of a `code_analysis` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    /// 0 to 10, higher is better.
    pub score: f32,
    pub technical_feedback: String,
    pub complexity_analysis: String,
    /// Not every service version fills this in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_quality: Option<String>,
}

/// Hint-only frame shape spoken by older service versions; it carries no
/// `"type"` tag at all. Only the bare shape matches: a frame with any other
/// field alongside `hint` is not legacy traffic.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LegacyHint {
    hint: String,
}

/// Parses one text frame from the socket.
///
/// Tries the tagged shapes first, then the legacy bare-hint shape (mapped to
/// [`InboundMessage::AiResponse`]). A frame matching neither becomes an
/// [`InboundMessage::Error`] carrying the parse failure, so a protocol drift
/// shows up in the feed instead of vanishing.
pub fn parse_inbound(text: &str) -> InboundMessage {
    match serde_json::from_str::<InboundMessage>(text) {
        Ok(message) => message,
        Err(tagged_err) => match serde_json::from_str::<LegacyHint>(text) {
            Ok(legacy) => InboundMessage::AiResponse {
                message: legacy.hint,
                timestamp: None,
            },
            Err(_) => InboundMessage::Error {
                message: format!("unrecognized frame from hint service: {tagged_err}"),
                timestamp: None,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outbound_frames_use_type_content_envelopes() {
        let cases = [
            (
                OutboundMessage::ProblemDescription("Two Sum".into()),
                json!({"type": "problem_description", "content": "Two Sum"}),
            ),
            (
                OutboundMessage::Explanation("hash map, one pass".into()),
                json!({"type": "explanation", "content": "hash map, one pass"}),
            ),
            (
                OutboundMessage::Chat("can I get a nudge?".into()),
                json!({"type": "message", "content": "can I get a nudge?"}),
            ),
            (
                OutboundMessage::EndSession {},
                json!({"type": "end_session", "content": {}}),
            ),
        ];
        for (message, expected) in cases {
            assert_eq!(serde_json::to_value(&message).unwrap(), expected);
        }
    }

    #[test]
    fn code_submission_round_trips() {
        let message = OutboundMessage::CodeSubmission {
            code: "def solve():\n    pass".into(),
            language: Language::Python,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "code_submission",
                "content": {"code": "def solve():\n    pass", "language": "python"}
            })
        );
        let back: OutboundMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn silence_trigger_is_tagged_like_every_other_frame() {
        let message = OutboundMessage::SilenceTrigger {
            transcript: "so I was thinking".into(),
            problem: "Two Sum".into(),
            code: "pass".into(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "silence_trigger");
        assert_eq!(value["content"]["transcript"], "so I was thinking");
        assert_eq!(value["content"]["problem"], "Two Sum");
        assert_eq!(value["content"]["code"], "pass");
    }

    #[test]
    fn parses_ai_response() {
        let frame = r#"{"type": "ai_response", "message": "try a hash map", "timestamp": "2024-05-01T12:00:00"}"#;
        let parsed = parse_inbound(frame);
        assert_eq!(
            parsed,
            InboundMessage::AiResponse {
                message: "try a hash map".into(),
                timestamp: Some("2024-05-01T12:00:00".into()),
            }
        );
    }

    #[test]
    fn parses_code_analysis_with_and_without_quality() {
        let full = r#"{
            "type": "code_analysis",
            "analysis": {
                "score": 7,
                "technical_feedback": "solid",
                "complexity_analysis": "O(n)",
                "code_quality": "readable"
            },
            "timestamp": "t"
        }"#;
        match parse_inbound(full) {
            InboundMessage::CodeAnalysis { analysis, .. } => {
                assert_eq!(analysis.score, 7.0);
                assert_eq!(analysis.code_quality.as_deref(), Some("readable"));
            }
            other => panic!("expected code_analysis, got {other:?}"),
        }

        let bare = r#"{
            "type": "code_analysis",
            "analysis": {"score": 4.5, "technical_feedback": "hm", "complexity_analysis": "O(n^2)"}
        }"#;
        match parse_inbound(bare) {
            InboundMessage::CodeAnalysis { analysis, timestamp } => {
                assert_eq!(analysis.score, 4.5);
                assert_eq!(analysis.code_quality, None);
                assert_eq!(timestamp, None);
            }
            other => panic!("expected code_analysis, got {other:?}"),
        }
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let frame = r#"{"type": "session_summary", "summary": "well done", "timestamp": "t", "session_data": {"x": 1}}"#;
        assert_eq!(
            parse_inbound(frame),
            InboundMessage::SessionSummary {
                summary: "well done".into(),
                timestamp: Some("t".into()),
            }
        );
    }

    #[test]
    fn legacy_bare_hint_becomes_an_ai_response() {
        let parsed = parse_inbound(r#"{"hint": "think about edge cases"}"#);
        assert_eq!(
            parsed,
            InboundMessage::AiResponse {
                message: "think about edge cases".into(),
                timestamp: None,
            }
        );
    }

    #[test]
    fn frames_with_extra_fields_never_take_the_legacy_path() {
        // A hint field on its own does not make a frame legacy.
        for frame in [
            r#"{"type": "telemetry", "hint": "free advice"}"#,
            r#"{"hint": "free advice", "extra": 1}"#,
        ] {
            assert!(
                matches!(parse_inbound(frame), InboundMessage::Error { .. }),
                "should not parse as advice: {frame}"
            );
        }
    }

    #[test]
    fn unknown_tag_and_garbage_become_error_entries() {
        for frame in [r#"{"type": "telemetry", "payload": 1}"#, "not json at all"] {
            match parse_inbound(frame) {
                InboundMessage::Error { message, timestamp } => {
                    assert!(message.contains("unrecognized frame"), "got: {message}");
                    assert_eq!(timestamp, None);
                }
                other => panic!("expected error entry, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_known_tag_becomes_an_error_entry() {
        // Right tag, missing payload field.
        let parsed = parse_inbound(r#"{"type": "ai_response"}"#);
        assert!(matches!(parsed, InboundMessage::Error { .. }));
    }
}
