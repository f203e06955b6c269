//! Transcription aggregator: dedupes and orders transcript
//! fragments, keeping one `State` per session behind a
//! `parking_lot::RwLock`-guarded map — the same shape the donor's
//! `SessionStore` uses for its `RwLock<HashMap<...>>` registry.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use vsg_domain::session::{ConversationTurn, Speaker};

use crate::sink::TranscriptSink;

#[derive(Debug, Clone, Default)]
struct SessionState {
    turn_number: u64,
    history: Vec<ConversationTurn>,
    last_user_text: Option<String>,
    last_assistant_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    Recorded { turn_number: u64 },
    RejectedEmpty,
    RejectedDuplicate,
}

#[derive(Debug, Clone, Default)]
pub struct AggregatorStats {
    pub turn_count: u64,
    pub user_turns: u64,
    pub assistant_turns: u64,
}

pub struct TranscriptionAggregator {
    sessions: RwLock<HashMap<String, SessionState>>,
    sink: Arc<dyn TranscriptSink>,
}

impl TranscriptionAggregator {
    pub fn new(sink: Arc<dyn TranscriptSink>) -> Self {
        TranscriptionAggregator {
            sessions: RwLock::new(HashMap::new()),
            sink,
        }
    }

    /// Rejects empty/whitespace and consecutive-duplicate user fragments;
    /// otherwise increments `turn_number` and appends. Persistence is
    /// enqueued fire-and-forget — its failure never blocks the session.
    pub async fn handle_input(&self, session_id: &str, text: &str) -> HandleOutcome {
        self.handle(session_id, text, Speaker::User).await
    }

    /// Same dedup policy for the assistant side, without incrementing
    /// `turn_number` (output fragments are tied to the most recent
    /// question, not a new one).
    pub async fn handle_output(&self, session_id: &str, text: &str) -> HandleOutcome {
        self.handle(session_id, text, Speaker::Assistant).await
    }

    async fn handle(&self, session_id: &str, text: &str, speaker: Speaker) -> HandleOutcome {
        if text.trim().is_empty() {
            return HandleOutcome::RejectedEmpty;
        }

        let turn = {
            let mut sessions = self.sessions.write();
            let state = sessions.entry(session_id.to_string()).or_default();

            let last = match speaker {
                Speaker::User => &state.last_user_text,
                Speaker::Assistant => &state.last_assistant_text,
            };
            if last.as_deref() == Some(text) {
                return HandleOutcome::RejectedDuplicate;
            }

            if speaker == Speaker::User {
                state.turn_number += 1;
            }
            let turn = ConversationTurn {
                speaker,
                text: text.to_string(),
                timestamp: Utc::now(),
                is_final: true,
            };
            state.history.push(turn.clone());
            match speaker {
                Speaker::User => state.last_user_text = Some(text.to_string()),
                Speaker::Assistant => state.last_assistant_text = Some(text.to_string()),
            }
            turn
        };

        if let Err(e) = self.sink.append(session_id, &turn).await {
            tracing::warn!(session_id, error = %e, "transcript persistence failed, continuing");
        }

        let turn_number = self.sessions.read().get(session_id).map(|s| s.turn_number).unwrap_or(0);
        HandleOutcome::Recorded { turn_number }
    }

    pub fn cleanup(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    pub fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub fn stats(&self, session_id: &str) -> AggregatorStats {
        let sessions = self.sessions.read();
        let Some(state) = sessions.get(session_id) else {
            return AggregatorStats::default();
        };
        let user_turns = state
            .history
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .count() as u64;
        let assistant_turns = state.history.len() as u64 - user_turns;
        AggregatorStats {
            turn_count: state.history.len() as u64,
            user_turns,
            assistant_turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemoryTranscriptSink;

    fn aggregator() -> TranscriptionAggregator {
        TranscriptionAggregator::new(Arc::new(InMemoryTranscriptSink::new()))
    }

    #[tokio::test]
    async fn rejects_empty_and_whitespace_input() {
        let agg = aggregator();
        assert_eq!(agg.handle_input("s1", "").await, HandleOutcome::RejectedEmpty);
        assert_eq!(agg.handle_input("s1", "   ").await, HandleOutcome::RejectedEmpty);
    }

    #[tokio::test]
    async fn rejects_consecutive_duplicate_user_text() {
        let agg = aggregator();
        agg.handle_input("s1", "hello").await;
        let outcome = agg.handle_input("s1", "hello").await;
        assert_eq!(outcome, HandleOutcome::RejectedDuplicate);
        assert_eq!(agg.history("s1").len(), 1);
    }

    #[tokio::test]
    async fn non_consecutive_repeat_is_accepted() {
        let agg = aggregator();
        agg.handle_input("s1", "hello").await;
        agg.handle_input("s1", "goodbye").await;
        let outcome = agg.handle_input("s1", "hello").await;
        assert!(matches!(outcome, HandleOutcome::Recorded { .. }));
        assert_eq!(agg.history("s1").len(), 3);
    }

    #[tokio::test]
    async fn output_does_not_increment_turn_number() {
        let agg = aggregator();
        agg.handle_input("s1", "hi").await;
        let before = agg.stats("s1").turn_count;
        agg.handle_output("s1", "hello there").await;
        let after = agg.stats("s1").turn_count;
        assert_eq!(after, before + 1);
    }

    #[tokio::test]
    async fn cleanup_drops_all_session_state() {
        let agg = aggregator();
        agg.handle_input("s1", "hi").await;
        agg.cleanup("s1");
        assert!(agg.history("s1").is_empty());
    }
}
