//! Shared error taxonomy for the voice-survey gateway.
//!
//! Every variant carries its own recoverability, matching the authoritative
//! table: recoverable errors are retried or absorbed; non-recoverable
//! errors terminate the session gracefully. Recoverability is a property of
//! the variant, never a free-form boolean threaded through call sites.

use serde::Serialize;

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("websocket disconnected: {0}")]
    WsDisconnected(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("upstream stream error: {0}")]
    StreamError(String),
    #[error("tool call timed out: {0}")]
    ToolTimeout(String),
    #[error("tool execution error: {0}")]
    ToolExecutionError(String),
    #[error("peer going away: {0}")]
    GoAway(String),
    #[error("persistence write failed: {0}")]
    DbWriteFailed(String),
    #[error("upstream connection failed: {0}")]
    ConnectionFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session expired: {0}")]
    SessionExpired(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error("tool call cancelled: {0}")]
    ToolCancelled(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("reconnection attempts exhausted: {0}")]
    ReconnectionExhausted(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("internal error: {0}")]
    Internal(String),

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable wire-facing error code. One per [`Error`] variant, never the raw
/// `Display` text (which may contain detail the client should not see).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    WsDisconnected,
    RateLimited,
    StreamError,
    ToolTimeout,
    ToolExecutionError,
    GoAway,
    DbWriteFailed,
    ConnectionFailed,
    AuthFailed,
    SessionNotFound,
    SessionExpired,
    InvalidParameters,
    ToolNotFound,
    ToolCancelled,
    Unauthorized,
    InvalidMessage,
    ReconnectionExhausted,
    ValidationError,
    InternalError,
    Config,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::WsDisconnected(_) => ErrorCode::WsDisconnected,
            Error::RateLimited(_) => ErrorCode::RateLimited,
            Error::StreamError(_) => ErrorCode::StreamError,
            Error::ToolTimeout(_) => ErrorCode::ToolTimeout,
            Error::ToolExecutionError(_) => ErrorCode::ToolExecutionError,
            Error::GoAway(_) => ErrorCode::GoAway,
            Error::DbWriteFailed(_) => ErrorCode::DbWriteFailed,
            Error::ConnectionFailed(_) => ErrorCode::ConnectionFailed,
            Error::AuthFailed(_) => ErrorCode::AuthFailed,
            Error::SessionNotFound(_) => ErrorCode::SessionNotFound,
            Error::SessionExpired(_) => ErrorCode::SessionExpired,
            Error::InvalidParameters(_) => ErrorCode::InvalidParameters,
            Error::ToolNotFound(_) => ErrorCode::ToolNotFound,
            Error::ToolCancelled(_) => ErrorCode::ToolCancelled,
            Error::Unauthorized(_) => ErrorCode::Unauthorized,
            Error::InvalidMessage(_) => ErrorCode::InvalidMessage,
            Error::ReconnectionExhausted(_) => ErrorCode::ReconnectionExhausted,
            Error::ValidationError(_) => ErrorCode::ValidationError,
            Error::Internal(_) => ErrorCode::InternalError,
            Error::Config(_) => ErrorCode::Config,
        }
    }

    /// Recoverable/non-recoverable split for upstream and transport errors.
    pub fn recoverable(&self) -> bool {
        matches!(
            self,
            Error::WsDisconnected(_)
                | Error::RateLimited(_)
                | Error::StreamError(_)
                | Error::ToolTimeout(_)
                | Error::ToolExecutionError(_)
                | Error::GoAway(_)
                | Error::DbWriteFailed(_)
                | Error::ConnectionFailed(_)
        )
    }

    /// The exact string placed in a client-visible `error.errorCode` field.
    /// Most codes are just the `SCREAMING_SNAKE_CASE` of [`ErrorCode`], but a
    /// couple of call sites use a more specific, historically-fixed string
    /// (the endpoint-reconnect-exhausted and rate-limit codes) that predates
    /// the general taxonomy and is kept for client compatibility.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Error::ReconnectionExhausted(_) => "GEMINI_RECONNECTION_FAILED",
            Error::RateLimited(_) => "WS_RATE_LIMIT_EXCEEDED",
            Error::WsDisconnected(_) => "WS_DISCONNECTED",
            _ => match self.code() {
                ErrorCode::WsDisconnected => "WS_DISCONNECTED",
                ErrorCode::RateLimited => "RATE_LIMITED",
                ErrorCode::StreamError => "STREAM_ERROR",
                ErrorCode::ToolTimeout => "TOOL_TIMEOUT",
                ErrorCode::ToolExecutionError => "TOOL_EXECUTION_ERROR",
                ErrorCode::GoAway => "GO_AWAY",
                ErrorCode::DbWriteFailed => "DB_WRITE_FAILED",
                ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
                ErrorCode::AuthFailed => "AUTH_FAILED",
                ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
                ErrorCode::SessionExpired => "SESSION_EXPIRED",
                ErrorCode::InvalidParameters => "INVALID_PARAMETERS",
                ErrorCode::ToolNotFound => "TOOL_NOT_FOUND",
                ErrorCode::ToolCancelled => "TOOL_CANCELLED",
                ErrorCode::Unauthorized => "UNAUTHORIZED",
                ErrorCode::InvalidMessage => "INVALID_MESSAGE",
                ErrorCode::ReconnectionExhausted => "RECONNECTION_EXHAUSTED",
                ErrorCode::ValidationError => "VALIDATION_ERROR",
                ErrorCode::InternalError => "INTERNAL_ERROR",
                ErrorCode::Config => "CONFIG_ERROR",
            },
        }
    }

    /// A constant, implementation-detail-free message safe to send to the
    /// client. Raw messages, stack frames, and file paths never leak past
    /// this boundary — see `vsg_tools::sanitize::sanitize_error_text` for the
    /// tool-result-specific variant of this policy.
    pub fn user_message(&self) -> &'static str {
        match self.code() {
            ErrorCode::WsDisconnected => "the connection to the voice service dropped",
            ErrorCode::RateLimited => "too many requests, please slow down",
            ErrorCode::StreamError => "a streaming error occurred, retrying",
            ErrorCode::ToolTimeout => "a tool call took too long to respond",
            ErrorCode::ToolExecutionError => "a tool call failed to execute",
            ErrorCode::GoAway => "the voice service asked us to reconnect",
            ErrorCode::DbWriteFailed => "a background save failed, continuing",
            ErrorCode::ConnectionFailed => "could not reach the voice service",
            ErrorCode::AuthFailed => "authentication with the voice service failed",
            ErrorCode::SessionNotFound => "this session no longer exists",
            ErrorCode::SessionExpired => "this session has expired",
            ErrorCode::InvalidParameters => "invalid parameters",
            ErrorCode::ToolNotFound => "requested tool is not available",
            ErrorCode::ToolCancelled => "tool call was cancelled",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::InvalidMessage => "invalid message",
            ErrorCode::ReconnectionExhausted => "could not reconnect to the voice service",
            ErrorCode::ValidationError => "the message failed validation",
            ErrorCode::InternalError => "an internal error occurred",
            ErrorCode::Config => "server misconfiguration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_matches_authoritative_table() {
        assert!(Error::WsDisconnected("x".into()).recoverable());
        assert!(Error::RateLimited("x".into()).recoverable());
        assert!(Error::StreamError("x".into()).recoverable());
        assert!(Error::ToolTimeout("x".into()).recoverable());
        assert!(Error::ToolExecutionError("x".into()).recoverable());
        assert!(Error::GoAway("x".into()).recoverable());
        assert!(Error::DbWriteFailed("x".into()).recoverable());
        assert!(Error::ConnectionFailed("x".into()).recoverable());

        assert!(!Error::AuthFailed("x".into()).recoverable());
        assert!(!Error::SessionNotFound("x".into()).recoverable());
        assert!(!Error::SessionExpired("x".into()).recoverable());
        assert!(!Error::InvalidParameters("x".into()).recoverable());
        assert!(!Error::ToolNotFound("x".into()).recoverable());
        assert!(!Error::ToolCancelled("x".into()).recoverable());
        assert!(!Error::Unauthorized("x".into()).recoverable());
    }

    #[test]
    fn wire_code_uses_fixed_legacy_strings_where_specified() {
        assert_eq!(
            Error::ReconnectionExhausted("x".into()).wire_code(),
            "GEMINI_RECONNECTION_FAILED"
        );
        assert_eq!(Error::RateLimited("x".into()).wire_code(), "WS_RATE_LIMIT_EXCEEDED");
    }

    #[test]
    fn user_message_never_echoes_raw_detail() {
        let err = Error::Internal("leaked/path/to/file.rs:42".into());
        assert!(!err.user_message().contains("leaked"));
    }
}
