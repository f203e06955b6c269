//! Session and conversation data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Terminated,
    Abandoned,
    Error,
}

impl SessionStatus {
    /// Once a session reaches a terminal state it never leaves it.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_final: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamingMetrics {
    pub chunks_sent: u64,
    pub chunks_received: u64,
    pub tool_calls_executed: u64,
    pub tool_execution_ms_total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub raw_text: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub questionnaire_id: String,
    pub language: String,
    pub voice_id: String,
    pub user_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub responses: HashMap<String, AnswerRecord>,
    pub history: Vec<ConversationTurn>,
    pub upstream_session_id: Option<String>,
    pub metrics: StreamingMetrics,
}

impl Session {
    pub fn new(
        session_id: SessionId,
        questionnaire_id: impl Into<String>,
        language: impl Into<String>,
        voice_id: impl Into<String>,
        user_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Session {
            session_id,
            questionnaire_id: questionnaire_id.into(),
            language: language.into(),
            voice_id: voice_id.into(),
            user_id,
            started_at: now,
            last_activity_at: now,
            status: SessionStatus::Active,
            current_question_index: 0,
            responses: HashMap::new(),
            history: Vec::new(),
            upstream_session_id: None,
            metrics: StreamingMetrics::default(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// A terminal status is sticky; transitions out of it are rejected.
    pub fn transition_to(&mut self, status: SessionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    pub fn completion_rate(&self, total_questions: usize) -> f64 {
        if total_questions == 0 {
            return 0.0;
        }
        self.responses.len() as f64 / total_questions as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_status_is_sticky() {
        let mut s = Session::new("s1".into(), "q1", "en-US", "Charon", None);
        assert!(s.transition_to(SessionStatus::Completed));
        assert!(!s.transition_to(SessionStatus::Error));
        assert_eq!(s.status, SessionStatus::Completed);
    }

    #[test]
    fn completion_rate_is_answered_over_total() {
        let mut s = Session::new("s1".into(), "q1", "en-US", "Charon", None);
        s.responses.insert(
            "q1".into(),
            AnswerRecord {
                question_id: "q1".into(),
                raw_text: "yes".into(),
                recorded_at: Utc::now(),
            },
        );
        assert!((s.completion_rate(4) - 0.25).abs() < f64::EPSILON);
    }
}
