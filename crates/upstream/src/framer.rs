//! Message framer: pure, side-effect-free constructors and
//! parsers for upstream frames. A built frame round-trips through
//! serialize/parse without loss; unknown fields on inbound frames are
//! tolerated rather than rejected.
//!
//! Field naming follows the endpoint's own camelCase vocabulary
//! (`setupComplete`, `toolCallCancellation`, ...) for both directions —
//! the camelCase variant is the only one implemented here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vsg_domain::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct SetupParams {
    pub model: String,
    pub voice_name: String,
    pub system_instruction: String,
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Builds the setup frame sent immediately after socket open: model,
/// audio-only response modality with the resolved canonical voice, the
/// system-instruction text, both transcription toggles on, VAD
/// configuration with barge-in enabled, and optional function
/// declarations.
pub fn build_setup_frame(params: &SetupParams) -> Value {
    let mut setup = json!({
        "model": params.model,
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": params.voice_name }
                }
            }
        },
        "systemInstruction": {
            "parts": [{ "text": params.system_instruction }]
        },
        "inputAudioTranscription": {},
        "outputAudioTranscription": {},
        "realtimeInputConfig": {
            "automaticActivityDetection": {
                "startOfSpeechSensitivity": "START_SENSITIVITY_HIGH",
                "endOfSpeechSensitivity": "END_SENSITIVITY_HIGH",
                "prefixPaddingMs": 20,
                "silenceDurationMs": 500
            },
            "activityHandling": "START_OF_ACTIVITY_INTERRUPTS"
        }
    });

    if !params.function_declarations.is_empty() {
        let tools: Vec<Value> = params
            .function_declarations
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "description": f.description,
                    "parameters": f.parameters,
                })
            })
            .collect();
        setup["tools"] = json!([{ "functionDeclarations": tools }]);
    }

    json!({ "setup": setup })
}

/// Audio ingest frame carrying one PCM chunk.
pub fn build_audio_chunk_frame(base64_payload: &str) -> Value {
    json!({
        "realtimeInput": {
            "mediaChunks": [{
                "mimeType": "audio/pcm;rate=16000",
                "data": base64_payload,
            }]
        }
    })
}

/// Tool (function) response frame sent back upstream after dispatch.
pub fn build_tool_response_frame(call_id: &str, name: &str, response: Value) -> Value {
    json!({
        "toolResponse": {
            "functionResponses": [{
                "id": call_id,
                "name": name,
                "response": response,
            }]
        }
    })
}

/// Minimal text turn, used to signal "start speaking" once the system
/// prompt has already set the opening instruction.
pub fn build_text_turn_frame(text: &str, turn_complete: bool) -> Value {
    json!({
        "clientContent": {
            "turns": [{
                "role": "user",
                "parts": [{ "text": text }]
            }],
            "turnComplete": turn_complete,
        }
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamFunctionCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ServerContentEvent {
    pub audio_chunks_base64: Vec<String>,
    pub input_transcription: Option<String>,
    pub output_transcription: Option<String>,
    pub interrupted: bool,
    pub turn_complete: bool,
}

#[derive(Debug, Clone)]
pub enum InboundEvent {
    SetupComplete { upstream_session_id: Option<String> },
    ServerContent(ServerContentEvent),
    ToolCall { calls: Vec<UpstreamFunctionCall> },
    ToolCallCancellation { ids: Vec<String> },
    GoAway { time_left_ms: Option<u64> },
}

/// Parses one inbound frame. Unknown top-level keys and unknown nested
/// fields are ignored rather than rejected — only a frame with none of the
/// recognized top-level keys is an error.
pub fn parse_inbound(value: &Value) -> Result<InboundEvent> {
    if let Some(sc) = value.get("setupComplete") {
        let upstream_session_id = sc
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Ok(InboundEvent::SetupComplete { upstream_session_id });
    }

    if let Some(content) = value.get("serverContent") {
        let mut event = ServerContentEvent::default();
        if let Some(parts) = content
            .get("modelTurn")
            .and_then(|t| t.get("parts"))
            .and_then(Value::as_array)
        {
            for part in parts {
                if let Some(data) = part
                    .get("inlineData")
                    .and_then(|d| d.get("data"))
                    .and_then(Value::as_str)
                {
                    event.audio_chunks_base64.push(data.to_string());
                }
            }
        }
        event.input_transcription = content
            .get("inputTranscription")
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string);
        event.output_transcription = content
            .get("outputTranscription")
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string);
        event.interrupted = content
            .get("interrupted")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        event.turn_complete = content
            .get("turnComplete")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        return Ok(InboundEvent::ServerContent(event));
    }

    if let Some(tool_call) = value.get("toolCall") {
        let calls: Vec<UpstreamFunctionCall> = tool_call
            .get("functionCalls")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        return Ok(InboundEvent::ToolCall { calls });
    }

    if let Some(cancellation) = value.get("toolCallCancellation") {
        let ids = cancellation
            .get("ids")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        return Ok(InboundEvent::ToolCallCancellation { ids });
    }

    if let Some(go_away) = value.get("goAway") {
        let time_left_ms = go_away
            .get("timeLeft")
            .and_then(Value::as_str)
            .and_then(|s| s.trim_end_matches('s').parse::<f64>().ok())
            .map(|secs| (secs * 1000.0) as u64);
        return Ok(InboundEvent::GoAway { time_left_ms });
    }

    Err(Error::InvalidMessage(format!(
        "unrecognized inbound frame shape: {value}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_frame_round_trips_through_serialize_parse() {
        let params = SetupParams {
            model: "gemini-2.0-flash-live".into(),
            voice_name: "Charon".into(),
            system_instruction: "Welcome to the survey.".into(),
            function_declarations: vec![],
        };
        let built = build_setup_frame(&params);
        let text = serde_json::to_string(&built).unwrap();
        let reparsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(built, reparsed);
        assert_eq!(
            reparsed["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Charon"
        );
    }

    #[test]
    fn audio_chunk_frame_carries_pcm_mime_type() {
        let frame = build_audio_chunk_frame("AAAA");
        assert_eq!(
            frame["realtimeInput"]["mediaChunks"][0]["mimeType"],
            "audio/pcm;rate=16000"
        );
    }

    #[test]
    fn parses_setup_complete_with_session_id() {
        let value = json!({ "setupComplete": { "sessionId": "abc123" } });
        match parse_inbound(&value).unwrap() {
            InboundEvent::SetupComplete { upstream_session_id } => {
                assert_eq!(upstream_session_id.as_deref(), Some("abc123"));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn parses_server_content_with_interrupted_flag() {
        let value = json!({ "serverContent": { "interrupted": true } });
        match parse_inbound(&value).unwrap() {
            InboundEvent::ServerContent(e) => assert!(e.interrupted),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_nested_fields_are_tolerated() {
        let value = json!({
            "serverContent": { "turnComplete": true, "somethingNew": 42 }
        });
        let parsed = parse_inbound(&value).unwrap();
        match parsed {
            InboundEvent::ServerContent(e) => assert!(e.turn_complete),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_frame_is_invalid_message() {
        let value = json!({ "somethingElse": {} });
        assert!(parse_inbound(&value).is_err());
    }

    #[test]
    fn parses_tool_call_with_function_calls() {
        let value = json!({
            "toolCall": { "functionCalls": [{"id": "c1", "name": "record_response", "args": {"x": 1}}] }
        });
        match parse_inbound(&value).unwrap() {
            InboundEvent::ToolCall { calls } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "c1");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
