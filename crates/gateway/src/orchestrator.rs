//! Per-connection session wiring: owns the `session:start`/`session:end`
//! lifecycle and the upstream-event routing table. One orchestrator
//! instance lives for the lifetime of one client WebSocket connection and
//! is driven entirely from the single task in `ws::handle_socket` — no
//! internal locking is needed because client events and upstream events
//! are already interleaved on that one task before they reach here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use vsg_domain::error::{Error, Result};
use vsg_domain::session::{AnswerRecord, Session, SessionStatus};
use vsg_domain::tool::ToolCall;
use vsg_protocol::{EndReason, QuestionSummary, ServerEvent};
use vsg_upstream::client::{self, UpstreamClientHandle, UpstreamEvent};
use vsg_upstream::framer::SetupParams;
use vsg_upstream::ReconnectPolicy;

use crate::state::AppState;

/// Stands in for the out-of-scope post-session survey extractor: the real
/// implementation would run an NLP pass over the conversation history and
/// map open-ended answers onto questionnaire fields.
pub trait SurveyExtractor: Send + Sync {
    fn extract(&self, session: &Session) -> Value;
}

pub struct NullSurveyExtractor;

impl SurveyExtractor for NullSurveyExtractor {
    fn extract(&self, session: &Session) -> Value {
        let answers: HashMap<&str, &str> = session
            .responses
            .iter()
            .map(|(id, a)| (id.as_str(), a.raw_text.as_str()))
            .collect();
        serde_json::to_value(answers).unwrap_or(Value::Null)
    }
}

/// Stands in for the out-of-scope per-response sentiment analyzer.
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, responses: &HashMap<String, AnswerRecord>) -> Value;
}

pub struct NullSentimentAnalyzer;

impl SentimentAnalyzer for NullSentimentAnalyzer {
    fn analyze(&self, _responses: &HashMap<String, AnswerRecord>) -> Value {
        Value::Null
    }
}

/// Stands in for the out-of-scope audio-blob persistence layer.
#[async_trait]
pub trait RecordingSink: Send + Sync {
    async fn append(&self, session_id: &str, payload_base64: &str) -> Result<()>;
    async fn flush(&self, session_id: &str) -> Result<Option<String>>;
}

pub struct NullRecordingSink;

#[async_trait]
impl RecordingSink for NullRecordingSink {
    async fn append(&self, _session_id: &str, _payload_base64: &str) -> Result<()> {
        Ok(())
    }

    async fn flush(&self, _session_id: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Tracks whether the assistant is mid-turn so the first audio chunk of a
/// new turn can trigger `turn:start` while later chunks in the same turn
/// do not. Once a turn is interrupted, any further chunks belonging to
/// that same turn are suppressed until `turn:complete` starts a fresh one.
struct TurnTracker {
    open: bool,
    suppressed: bool,
}

impl TurnTracker {
    fn new() -> Self {
        TurnTracker { open: false, suppressed: false }
    }

    /// `None` means this chunk must not be forwarded (belongs to an
    /// already-interrupted turn). `Some(true)` means forward it and also
    /// emit `turn:start` first; `Some(false)` means forward it only.
    fn note_audio_chunk(&mut self) -> Option<bool> {
        if self.suppressed {
            return None;
        }
        if self.open {
            Some(false)
        } else {
            self.open = true;
            Some(true)
        }
    }

    /// Marks the current turn interrupted: its remaining audio is dropped
    /// but a new turn can still open normally afterward.
    fn interrupt(&mut self) {
        self.open = false;
        self.suppressed = true;
    }

    fn close(&mut self) {
        self.open = false;
        self.suppressed = false;
    }
}

pub struct SessionOrchestrator {
    state: Arc<AppState>,
    session: Session,
    outbound: mpsc::Sender<ServerEvent>,
    upstream: Option<UpstreamClientHandle>,
    turn: TurnTracker,
    total_questions: usize,
    first_question: Option<vsg_domain::questionnaire::Question>,
    questionnaire_name: String,
    estimated_duration: u32,
    finished: AtomicBool,
    tool_results: mpsc::UnboundedSender<(String, vsg_domain::tool::ToolResult)>,
}

impl SessionOrchestrator {
    /// Returns the orchestrator plus the tool-result channel the caller
    /// must keep polling alongside the upstream event stream: dispatch runs
    /// detached (non-blocking), and its outcome is fed back here so session
    /// state (answered questions) is only ever mutated from the one owning
    /// task.
    pub fn new(
        state: Arc<AppState>,
        session_id: String,
        outbound: mpsc::Sender<ServerEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<(String, vsg_domain::tool::ToolResult)>) {
        let (tool_results_tx, tool_results_rx) = mpsc::unbounded_channel();
        let orchestrator = SessionOrchestrator {
            session: Session::new(session_id, String::new(), "en-US", "Charon", None),
            state,
            outbound,
            upstream: None,
            turn: TurnTracker::new(),
            total_questions: 0,
            first_question: None,
            questionnaire_name: String::new(),
            estimated_duration: 0,
            finished: AtomicBool::new(false),
            tool_results: tool_results_tx,
        };
        (orchestrator, tool_results_rx)
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    async fn emit(&self, event: ServerEvent) {
        let _ = self.outbound.send(event).await;
    }

    /// Handles `session:start`: loads the questionnaire, creates the session,
    /// resolves the voice, loads the system prompt, and opens the upstream
    /// connection. Returns the upstream event stream the
    /// caller should poll alongside the client socket.
    pub async fn start(
        &mut self,
        questionnaire_id: String,
        voice_id: String,
        language: Option<String>,
        user_id: Option<String>,
    ) -> Result<mpsc::UnboundedReceiver<UpstreamEvent>> {
        // 1. Load the questionnaire by id (fail the session if missing).
        let questionnaire = self
            .state
            .questionnaires
            .load(&questionnaire_id)
            .ok_or_else(|| Error::SessionNotFound(format!("unknown questionnaire '{questionnaire_id}'")))?;
        self.total_questions = questionnaire.total_questions();

        let language = language.unwrap_or_else(|| "en-US".to_string());

        // 2. Create the session record.
        self.session = Session::new(
            self.session.session_id.clone(),
            questionnaire_id.clone(),
            language.clone(),
            voice_id.clone(),
            user_id,
        );

        // 3. Resolve the voice alias.
        let resolved_voice = self.state.voice_resolver.resolve(&voice_id);
        self.session.voice_id = resolved_voice.clone();

        // 4. Load the system prompt by (questionnaire-id, language).
        let system_instruction = self.state.prompts.load(&questionnaire_id, &language)?;

        // 5. Build the tool declarations unless tools are disabled.
        let function_declarations = if self.state.config.upstream.disable_tools {
            Vec::new()
        } else {
            self.state
                .tools
                .declarations()
                .into_iter()
                .map(|(name, description, schema)| vsg_upstream::framer::FunctionDeclaration {
                    name: name.to_string(),
                    description: description.to_string(),
                    parameters: schema_to_json(schema),
                })
                .collect()
        };

        let credential = self.state.token_provider.authorization_header().await?;
        let setup = SetupParams {
            model: self.state.config.upstream.model.clone(),
            voice_name: resolved_voice,
            system_instruction,
            function_declarations,
        };
        let reconnect = ReconnectPolicy {
            max_retries: self.state.config.upstream.reconnect_max_retries,
            base_delay_ms: self.state.config.upstream.reconnect_base_delay_ms,
        };

        // 6 & 7. Spawn the upstream client; the routing table and the
        // opening text turn are driven by the caller as events arrive.
        let (handle, events) = client::spawn(self.state.upstream_url.clone(), credential, setup, reconnect);
        self.upstream = Some(handle);
        self.first_question = questionnaire.first_question().cloned();
        self.questionnaire_name = questionnaire.name.clone();
        self.estimated_duration = questionnaire.estimated_duration_secs;

        Ok(events)
    }

    pub fn forward_audio(&self, base64_payload: String) {
        if let Some(upstream) = &self.upstream {
            upstream.send_audio(base64_payload);
        }
    }

    /// Routes one event from the upstream connection to the client socket
    /// and/or orchestrator state.
    pub async fn handle_upstream_event(&mut self, event: UpstreamEvent) {
        self.session.touch();
        match event {
            UpstreamEvent::StateChange(_) => {}
            UpstreamEvent::SetupComplete { upstream_session_id } => {
                self.session.upstream_session_id = upstream_session_id;
                if let Some(question) = &self.first_question {
                    self.emit(ServerEvent::SessionReady {
                        questionnaire_name: self.questionnaire_name.clone(),
                        estimated_duration: self.estimated_duration,
                        first_question: QuestionSummary {
                            id: question.id.clone(),
                            prompt: question.prompt.clone(),
                        },
                    })
                    .await;
                }
                // 7. Signal "start speaking" now that setup has completed;
                // the opening instruction already lives in the system prompt.
                if let Some(upstream) = &self.upstream {
                    upstream.send_text_turn("", true);
                }
            }
            UpstreamEvent::AudioOutput { sequence, payload_base64 } => {
                let Some(is_new_turn) = self.turn.note_audio_chunk() else {
                    // Belongs to a turn that was already interrupted; drop it.
                    return;
                };
                if is_new_turn {
                    self.emit(ServerEvent::TurnStart {}).await;
                }
                let recording = self.state.recording.clone();
                let session_id = self.session.session_id.clone();
                let payload_for_recording = payload_base64.clone();
                tokio::spawn(async move {
                    if let Err(e) = recording.append(&session_id, &payload_for_recording).await {
                        tracing::warn!(session_id, error = %e, "recording buffer write failed, continuing");
                    }
                });
                self.session.metrics.chunks_sent += 1;
                self.emit(ServerEvent::AudioChunk {
                    audio_data: payload_base64,
                    sequence_number: sequence,
                })
                .await;
            }
            UpstreamEvent::InputTranscription(text) => {
                let outcome = self.state.transcripts.handle_input(&self.session.session_id, &text).await;
                if let vsg_transcript::HandleOutcome::Recorded { turn_number } = outcome {
                    self.emit(ServerEvent::TranscriptionUser { text, turn: turn_number }).await;
                }
            }
            UpstreamEvent::OutputTranscription(text) => {
                let outcome = self.state.transcripts.handle_output(&self.session.session_id, &text).await;
                if matches!(outcome, vsg_transcript::HandleOutcome::Recorded { .. }) {
                    self.emit(ServerEvent::TranscriptionAssistant { text }).await;
                }
            }
            UpstreamEvent::Interrupted => {
                // Idempotent regardless of prior state.
                self.turn.interrupt();
                self.emit(ServerEvent::Interruption {}).await;
            }
            UpstreamEvent::TurnComplete => {
                self.turn.close();
                self.emit(ServerEvent::TurnComplete {}).await;
            }
            UpstreamEvent::ToolCall(calls) => {
                for call in calls {
                    self.dispatch_tool_call(call).await;
                }
            }
            UpstreamEvent::ToolCallCancellation(ids) => {
                self.state.tools.cancel_all(&ids);
            }
            UpstreamEvent::GoAway { .. } => {
                tracing::info!(session_id = %self.session.session_id, "upstream sent goAway, reconnect loop permitted to run");
            }
            UpstreamEvent::Error(err) => {
                if err.recoverable() {
                    self.emit(ServerEvent::from_error(&err, retry_after_for(&err))).await;
                } else {
                    self.terminate_with_error(err).await;
                }
            }
        }
    }

    /// Dispatches one call through the tool registry without blocking the
    /// orchestrator's own loop. The upstream response goes out as soon as
    /// dispatch resolves; anything that needs to touch session state
    /// (recording an answer) is relayed back through `tool_results` so it
    /// still happens on the owning task.
    async fn dispatch_tool_call(&self, call: vsg_upstream::framer::UpstreamFunctionCall) {
        let tools = self.state.tools.clone();
        let upstream = self.upstream.clone();
        let results = self.tool_results.clone();
        let tool_call = ToolCall::new(call.id, call.name.clone(), call.args);
        let name = call.name;
        tokio::spawn(async move {
            let outcome = tools.dispatch(&tool_call).await;
            let Some(result) = outcome else {
                // Cancelled: per the dispatch contract, no response goes upstream.
                return;
            };
            if let Some(upstream) = upstream {
                let response = serde_json::json!({
                    "success": result.success,
                    "result": result.result,
                    "error": result.error,
                });
                upstream.send_tool_response(result.call_id.clone(), name.clone(), response);
            }
            let _ = results.send((name, result));
        });
    }

    /// Applies the outcome of a detached tool dispatch to session state.
    pub async fn handle_tool_result(&mut self, tool_name: String, result: vsg_domain::tool::ToolResult) {
        if !result.success || tool_name != "record_response" {
            return;
        }
        let Some(payload) = &result.result else { return };
        let (Some(question_id), Some(answer)) = (
            payload.get("questionId").and_then(Value::as_str),
            payload.get("answer").and_then(Value::as_str),
        ) else {
            return;
        };
        self.session.responses.insert(
            question_id.to_string(),
            AnswerRecord {
                question_id: question_id.to_string(),
                raw_text: answer.to_string(),
                recorded_at: chrono::Utc::now(),
            },
        );
        self.emit(ServerEvent::ResponseRecorded {
            question_id: question_id.to_string(),
        })
        .await;

        // Optional: a per-response sentiment pass, if the configured
        // analyzer has anything to say about this one answer.
        let just_recorded: HashMap<String, AnswerRecord> = self
            .session
            .responses
            .get(question_id)
            .map(|record| (question_id.to_string(), record.clone()))
            .into_iter()
            .collect();
        let analysis = self.state.sentiment_analyzer.analyze(&just_recorded);
        if !analysis.is_null() {
            self.emit(ServerEvent::NlpAnalysis { analysis }).await;
        }
    }

    async fn terminate_with_error(&mut self, err: Error) {
        self.session.transition_to(SessionStatus::Error);
        self.emit(ServerEvent::from_error(&err, None)).await;
        self.finish(None).await;
    }

    /// The post-session pipeline, guarded so it runs exactly once per
    /// session even if `session:end` and client disconnect coincide.
    pub async fn finish(&mut self, reason: Option<EndReason>) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(upstream) = self.upstream.take() {
            upstream.disconnect();
        }

        let duration_ms = (chrono::Utc::now() - self.session.started_at)
            .num_milliseconds()
            .max(0) as u64;
        let completion_rate = self.session.completion_rate(self.total_questions.max(1));

        let status = match reason {
            Some(EndReason::Error) => SessionStatus::Error,
            Some(EndReason::Completed) => SessionStatus::Completed,
            _ if completion_rate >= 0.8 => SessionStatus::Completed,
            _ => SessionStatus::Abandoned,
        };
        if !self.session.status.is_terminal() {
            self.session.transition_to(status);
        }

        let recording_url = match self.state.recording.flush(&self.session.session_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(session_id = %self.session.session_id, error = %e, "recording flush failed");
                None
            }
        };

        let survey_answers = self.state.survey_extractor.extract(&self.session);
        let nlp_analysis = self.state.sentiment_analyzer.analyze(&self.session.responses);

        self.emit(ServerEvent::SurveyAnswers { answers: survey_answers.clone() }).await;

        self.state.transcripts.cleanup(&self.session.session_id);
        self.state.rate_limiter.remove(&self.session.session_id);

        let completion_status = match self.session.status {
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
            SessionStatus::Terminated => "terminated",
            _ => "abandoned",
        };

        self.emit(ServerEvent::SessionComplete {
            completion_status: completion_status.to_string(),
            total_questions: self.total_questions,
            answered_questions: self.session.responses.len(),
            duration_ms,
            recording_url,
            survey_answers: Some(survey_answers),
            nlp_analysis: Some(nlp_analysis),
        })
        .await;
    }
}

fn retry_after_for(err: &Error) -> Option<u64> {
    match err {
        Error::RateLimited(_) => Some(1),
        _ => None,
    }
}

fn schema_to_json(schema: &vsg_tools::Schema) -> Value {
    serde_json::to_value(schema).unwrap_or(Value::Null)
}
