//! Exhaustive substring/close-code → error-code classifier.
//! Pure and side-effect-free so it is unit-testable in isolation from the
//! socket plumbing in [`crate::client`].

use vsg_domain::error::Error;

/// Classifies a close code plus whatever diagnostic text accompanied it
/// (a close reason, an I/O error message, or an HTTP status line) against
/// the fixed substring/close-code table. This function never returns
/// `Ok`/`Err` — every input maps to *some* `Error`, because "otherwise" is
/// itself a taxonomy entry (`CONNECTION_FAILED`).
pub fn classify(close_code: Option<u16>, text: &str) -> Error {
    let lower = text.to_ascii_lowercase();
    let code = close_code.unwrap_or(0);

    if lower.contains("auth") || lower.contains("401") || lower.contains("403") || code == 401 || code == 403 {
        return Error::AuthFailed(text.to_string());
    }
    if lower.contains("rate limit") || lower.contains("429") || code == 429 || code == 1013 {
        return Error::RateLimited(text.to_string());
    }
    if lower.contains("stream")
        || lower.contains("eof")
        || lower.contains("reset")
        || code == 1009
        || code == 1011
    {
        return Error::StreamError(text.to_string());
    }
    if lower.contains("tool timeout") {
        return Error::ToolTimeout(text.to_string());
    }
    if lower.contains("parse") || lower.contains("malformed") || code == 1002 || code == 1003 {
        return Error::InvalidMessage(text.to_string());
    }
    if lower.contains("session not found") || lower.contains("expired") {
        return Error::SessionNotFound(text.to_string());
    }
    if lower.contains("going away") || lower.contains("go away") || code == 1001 || code == 1012 {
        return Error::GoAway(text.to_string());
    }
    Error::ConnectionFailed(text.to_string())
}
