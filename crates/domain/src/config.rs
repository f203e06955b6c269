//! Top-level gateway configuration, loadable from YAML/TOML/env and
//! validated with a severity-tagged error list rather than a bare
//! all-or-nothing `Result`, so `doctor`/`config validate` can report every
//! problem in one pass instead of stopping at the first.

use serde::{Deserialize, Serialize};
use std::fmt;

fn d_true() -> bool {
    true
}
fn d_false() -> bool {
    false
}
fn d_host() -> String {
    "0.0.0.0".to_string()
}
fn d_port() -> u16 {
    8787
}
fn d_model() -> String {
    "gemini-2.0-flash-live".to_string()
}
fn d_default_voice() -> String {
    "Charon".to_string()
}
fn d_reconnect_max_retries() -> u32 {
    3
}
fn d_reconnect_base_delay_ms() -> u64 {
    1000
}
fn d_tool_timeout_ms() -> u64 {
    5000
}
fn d_events_per_second() -> u32 {
    100
}
fn d_window_ms() -> u64 {
    1000
}
fn d_log_level() -> String {
    "info".to_string()
}
fn d_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:*".to_string(),
        "http://127.0.0.1:*".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub voice: VoiceConfig,
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            upstream: UpstreamConfig::default(),
            voice: VoiceConfig::default(),
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Required when the upstream feature is enabled; left empty otherwise
    /// so a `doctor` run on a disabled feature does not fail spuriously.
    pub project_id: String,
    pub region: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_reconnect_max_retries")]
    pub reconnect_max_retries: u32,
    #[serde(default = "d_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "d_tool_timeout_ms")]
    pub tool_timeout_ms: u64,
    #[serde(default = "d_false")]
    pub disable_tools: bool,
    #[serde(default = "d_true")]
    pub enabled: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            project_id: String::new(),
            region: String::new(),
            model: d_model(),
            reconnect_max_retries: d_reconnect_max_retries(),
            reconnect_base_delay_ms: d_reconnect_base_delay_ms(),
            tool_timeout_ms: d_tool_timeout_ms(),
            disable_tools: d_false(),
            enabled: d_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    #[serde(default = "d_default_voice")]
    pub default_voice: String,
    /// Legacy alias → canonical voice, merged on top of the built-in map in
    /// `vsg-upstream::resolver`.
    pub aliases: std::collections::HashMap<String, String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            default_voice: d_default_voice(),
            aliases: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: d_host(),
            port: d_port(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            allowed_origins: d_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    #[serde(default = "d_events_per_second")]
    pub events_per_second: u32,
    #[serde(default = "d_window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            events_per_second: d_events_per_second(),
            window_ms: d_window_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    #[serde(default = "d_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig { level: d_log_level() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

impl fmt::Display for ConfigSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSeverity::Error => write!(f, "error"),
            ConfigSeverity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        ConfigError {
            severity: ConfigSeverity::Error,
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        ConfigError {
            severity: ConfigSeverity::Warning,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Collects every problem rather than stopping at the first so
    /// `doctor`/`config validate` can print a full report.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.upstream.enabled {
            if self.upstream.project_id.trim().is_empty() {
                errors.push(ConfigError::error(
                    "upstream.project_id",
                    "required when the upstream feature is enabled",
                ));
            }
            if self.upstream.region.trim().is_empty() {
                errors.push(ConfigError::error(
                    "upstream.region",
                    "required when the upstream feature is enabled",
                ));
            }
        }

        if !(0..=10).contains(&self.upstream.reconnect_max_retries) {
            errors.push(ConfigError::error(
                "upstream.reconnect_max_retries",
                "must be in range 0..=10",
            ));
        }
        if self.upstream.reconnect_base_delay_ms < 100 {
            errors.push(ConfigError::error(
                "upstream.reconnect_base_delay_ms",
                "must be >= 100ms",
            ));
        }
        if self.upstream.tool_timeout_ms < 1000 {
            errors.push(ConfigError::error(
                "upstream.tool_timeout_ms",
                "must be >= 1000ms",
            ));
        }

        if self.server.host.trim().is_empty() {
            errors.push(ConfigError::error("server.host", "must not be empty"));
        }
        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "must be non-zero"));
        }

        if self.rate_limit.events_per_second == 0 {
            errors.push(ConfigError::error(
                "rate_limit.events_per_second",
                "must be > 0",
            ));
        }
        if self.rate_limit.window_ms == 0 {
            errors.push(ConfigError::error("rate_limit.window_ms", "must be > 0"));
        }

        if self
            .server
            .cors
            .allowed_origins
            .iter()
            .any(|o| o == "*")
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard origin disables credentialed CORS protection",
            ));
        }

        errors
    }

    pub fn has_fatal_errors(errors: &[ConfigError]) -> bool {
        errors.iter().any(|e| e.severity == ConfigSeverity::Error)
    }
}
