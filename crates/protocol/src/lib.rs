//! Wire contract for the client-facing transport. Tagged `serde`
//! enums mirror the donor's `WsMessage` `#[serde(tag = "type")]` pattern,
//! renamed per variant to the event names the wire contract fixes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every event on the wire carries `event`, `sessionId`, `timestamp`, and a
/// variant-specific `data` payload. `T` is adjacently tagged (`event` +
/// `data`), so flattening it here merges those two keys in alongside the
/// session/timestamp wrapper instead of re-nesting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: T,
}

impl<T> Envelope<T> {
    pub fn new(session_id: impl Into<String>, event: T) -> Self {
        Envelope {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ClientEvent {
    #[serde(rename = "session:start")]
    SessionStart {
        #[serde(rename = "questionnaireId")]
        questionnaire_id: String,
        #[serde(rename = "voiceId")]
        voice_id: String,
        #[serde(default)]
        language: Option<String>,
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
    #[serde(rename = "session:end")]
    SessionEnd {
        #[serde(default)]
        reason: Option<EndReason>,
    },
    #[serde(rename = "audio:chunk")]
    AudioChunk {
        #[serde(rename = "audioData")]
        audio_data: String,
        #[serde(rename = "sequenceNumber")]
        sequence_number: u64,
    },
    #[serde(rename = "config:update")]
    ConfigUpdate {
        #[serde(rename = "voiceId", default)]
        voice_id: Option<String>,
        #[serde(rename = "audioConfig", default)]
        audio_config: Option<Value>,
    },
    #[serde(rename = "questionnaire:select")]
    QuestionnaireSelect {
        #[serde(rename = "questionnaireId")]
        questionnaire_id: String,
    },
    #[serde(rename = "text:message")]
    TextMessage { text: String },
    #[serde(rename = "user:speaking")]
    UserSpeaking {},
    #[serde(rename = "transcript:update")]
    TranscriptUpdate {
        transcript: String,
        #[serde(rename = "questionnaireId")]
        questionnaire_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    UserEnded,
    Completed,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "session:ready")]
    SessionReady {
        #[serde(rename = "questionnaireName")]
        questionnaire_name: String,
        #[serde(rename = "estimatedDuration")]
        estimated_duration: u32,
        #[serde(rename = "firstQuestion")]
        first_question: QuestionSummary,
    },
    #[serde(rename = "transcription:user")]
    TranscriptionUser { text: String, turn: u64 },
    #[serde(rename = "transcription:assistant")]
    TranscriptionAssistant { text: String },
    #[serde(rename = "audio:chunk")]
    AudioChunk {
        #[serde(rename = "audioData")]
        audio_data: String,
        #[serde(rename = "sequenceNumber")]
        sequence_number: u64,
    },
    #[serde(rename = "turn:start")]
    TurnStart {},
    #[serde(rename = "turn:complete")]
    TurnComplete {},
    #[serde(rename = "interruption")]
    Interruption {},
    #[serde(rename = "response:recorded")]
    ResponseRecorded {
        #[serde(rename = "questionId")]
        question_id: String,
    },
    #[serde(rename = "nlp:analysis")]
    NlpAnalysis { analysis: Value },
    #[serde(rename = "survey:answers")]
    SurveyAnswers { answers: Value },
    #[serde(rename = "session:complete")]
    SessionComplete {
        #[serde(rename = "completionStatus")]
        completion_status: String,
        #[serde(rename = "totalQuestions")]
        total_questions: usize,
        #[serde(rename = "answeredQuestions")]
        answered_questions: usize,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
        #[serde(rename = "recordingUrl", skip_serializing_if = "Option::is_none")]
        recording_url: Option<String>,
        #[serde(rename = "surveyAnswers", skip_serializing_if = "Option::is_none")]
        survey_answers: Option<Value>,
        #[serde(rename = "nlpAnalysis", skip_serializing_if = "Option::is_none")]
        nlp_analysis: Option<Value>,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "errorCode")]
        error_code: String,
        #[serde(rename = "errorMessage")]
        error_message: String,
        recoverable: bool,
        #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
    },
}

impl ServerEvent {
    pub fn from_error(err: &vsg_domain::Error, retry_after: Option<u64>) -> Self {
        ServerEvent::Error {
            error_code: err.wire_code().to_string(),
            error_message: err.user_message().to_string(),
            recoverable: err.recoverable(),
            retry_after,
        }
    }
}
