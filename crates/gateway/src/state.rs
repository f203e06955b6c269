//! Shared application state handed to the WebSocket handler.
//!
//! Fields are grouped by concern, mirroring the donor's `AppState`:
//! - **Core services** — config, credential cache, upstream endpoint
//! - **Questionnaire & prompts** — the content the orchestrator wires in
//! - **Downstream transport** — rate limiting
//! - **Session-scoped registries** — transcription, tools
//! - **Post-session pipeline** — recording sink, analyzers

use std::sync::Arc;

use vsg_domain::config::Config;
use vsg_domain::prompt::SystemPromptLoader;
use vsg_domain::questionnaire::QuestionnaireLoader;
use vsg_token::CachedTokenProvider;
use vsg_tools::ToolRegistry;
use vsg_transcript::TranscriptionAggregator;
use vsg_transport::RateLimiter;
use vsg_upstream::VoiceResolver;

use crate::orchestrator::{RecordingSink, SentimentAnalyzer, SurveyExtractor};

#[derive(Clone)]
pub struct AppState {
    // ── Core services ───────────────────────────────────────────────
    pub config: Arc<Config>,
    pub token_provider: Arc<CachedTokenProvider>,
    pub upstream_url: String,

    // ── Questionnaire & prompts ─────────────────────────────────────
    pub questionnaires: Arc<dyn QuestionnaireLoader>,
    pub prompts: Arc<dyn SystemPromptLoader>,
    pub voice_resolver: Arc<VoiceResolver>,

    // ── Downstream transport ────────────────────────────────────────
    pub rate_limiter: Arc<RateLimiter>,

    // ── Session-scoped registries ───────────────────────────────────
    pub transcripts: Arc<TranscriptionAggregator>,
    pub tools: Arc<ToolRegistry>,

    // ── Post-session pipeline ───────────────────────────────────────
    pub recording: Arc<dyn RecordingSink>,
    pub survey_extractor: Arc<dyn SurveyExtractor>,
    pub sentiment_analyzer: Arc<dyn SentimentAnalyzer>,
}
