//! Contract for the (out-of-scope) questionnaire loader, plus a static
//! in-memory stand-in so the orchestrator and its tests do not depend on an
//! external service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub open_ended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: String,
    pub name: String,
    pub estimated_duration_secs: u32,
    pub questions: Vec<Question>,
}

impl Questionnaire {
    pub fn first_question(&self) -> Option<&Question> {
        self.questions.first()
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }
}

pub trait QuestionnaireLoader: Send + Sync {
    fn load(&self, questionnaire_id: &str) -> Option<Questionnaire>;
}

/// Returns a static per-id configuration blob, standing in for the real
/// (out-of-scope) loader. Seeded with one demo questionnaire so the
/// end-to-end tests have something to load.
pub struct StaticQuestionnaireLoader {
    blobs: HashMap<String, Questionnaire>,
}

impl StaticQuestionnaireLoader {
    pub fn new() -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(
            "demo-01a-electronics-retail".to_string(),
            Questionnaire {
                id: "demo-01a-electronics-retail".to_string(),
                name: "Electronics Retail Satisfaction".to_string(),
                estimated_duration_secs: 240,
                questions: vec![
                    Question {
                        id: "q1".into(),
                        prompt: "How satisfied were you with your recent purchase?".into(),
                        open_ended: true,
                    },
                    Question {
                        id: "q2".into(),
                        prompt: "Would you recommend us to a friend?".into(),
                        open_ended: false,
                    },
                ],
            },
        );
        StaticQuestionnaireLoader { blobs }
    }

    pub fn with_blob(mut self, q: Questionnaire) -> Self {
        self.blobs.insert(q.id.clone(), q);
        self
    }
}

impl Default for StaticQuestionnaireLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionnaireLoader for StaticQuestionnaireLoader {
    fn load(&self, questionnaire_id: &str) -> Option<Questionnaire> {
        self.blobs.get(questionnaire_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_the_seeded_demo_questionnaire() {
        let loader = StaticQuestionnaireLoader::new();
        let q = loader.load("demo-01a-electronics-retail").unwrap();
        assert_eq!(q.total_questions(), 2);
        assert_eq!(q.first_question().unwrap().id, "q1");
    }

    #[test]
    fn unknown_id_is_none() {
        let loader = StaticQuestionnaireLoader::new();
        assert!(loader.load("nope").is_none());
    }
}
