//! Shared boot path: construct every subsystem in dependency order and
//! fail fast on configuration errors, mirroring the donor's `run_server`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Duration as ChronoDuration;

use vsg_domain::config::{Config, ConfigSeverity};
use vsg_domain::questionnaire::StaticQuestionnaireLoader;
use vsg_domain::prompt::TemplatePromptLoader;
use vsg_token::{CachedTokenProvider, StaticCredentialFetcher};
use vsg_tools::{handlers, ToolRegistry};
use vsg_transcript::{InMemoryTranscriptSink, TranscriptionAggregator};
use vsg_transport::RateLimiter;
use vsg_upstream::VoiceResolver;

use crate::orchestrator::{NullRecordingSink, NullSentimentAnalyzer, NullSurveyExtractor};
use crate::state::AppState;

/// Validates `config`, logging every issue by severity, and bails if any
/// issue is fatal.
pub fn validate_or_bail(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if Config::has_fatal_errors(&issues) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }
    Ok(())
}

pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    tracing::info!("voicesurvey-gateway starting");
    validate_or_bail(&config)?;

    let fetcher = Arc::new(StaticCredentialFetcher::new(
        "demo-bearer-token",
        ChronoDuration::hours(1),
    ));
    let (token_provider, mut auth_failures) = CachedTokenProvider::new(fetcher);
    let token_provider = Arc::new(token_provider);
    tokio::spawn(async move {
        while let Some(event) = auth_failures.recv().await {
            tracing::warn!(code = %event.error_code, "credential refresh failed");
        }
    });
    tracing::info!("credential provider ready");

    let voice_resolver = Arc::new(VoiceResolver::new(
        config.voice.default_voice.clone(),
        &config.voice.aliases,
    ));
    tracing::info!(default_voice = %config.voice.default_voice, "voice resolver ready");

    let questionnaires = Arc::new(StaticQuestionnaireLoader::new());
    let prompts = Arc::new(TemplatePromptLoader);
    tracing::info!("questionnaire and prompt loaders ready (bundled demo content)");

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit.events_per_second,
        config.rate_limit.window_ms,
    ));
    tracing::info!(
        events_per_second = config.rate_limit.events_per_second,
        window_ms = config.rate_limit.window_ms,
        "rate limiter ready"
    );

    let transcripts = Arc::new(TranscriptionAggregator::new(Arc::new(InMemoryTranscriptSink::new())));
    tracing::info!("transcription aggregator ready");

    let mut registry = ToolRegistry::new(Duration::from_millis(config.upstream.tool_timeout_ms));
    if !config.upstream.disable_tools {
        registry.register(handlers::record_response_definition());
        registry.register(handlers::end_survey_definition());
    }
    let tools = Arc::new(registry);
    tracing::info!(disabled = config.upstream.disable_tools, "tool registry ready");

    let upstream_url = std::env::var("VSG_UPSTREAM_URL")
        .unwrap_or_else(|_| "wss://example-upstream.invalid/v1/live".to_string());

    Ok(AppState {
        config,
        token_provider,
        upstream_url,
        questionnaires,
        prompts,
        voice_resolver,
        rate_limiter,
        transcripts,
        tools,
        recording: Arc::new(NullRecordingSink),
        survey_extractor: Arc::new(NullSurveyExtractor),
        sentiment_analyzer: Arc::new(NullSentimentAnalyzer),
    })
}

pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("VSG_CONFIG").unwrap_or_else(|_| "config.yaml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {config_path}"))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {config_path}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}
