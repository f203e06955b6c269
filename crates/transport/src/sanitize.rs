//! Inbound string sanitization: detects injection
//! signatures and logs them, then passes the sanitized string onward.
//! Audio payloads are exempt — they are opaque encoded binary, not text.

const INJECTION_SIGNATURES: &[&str] = &["<script", "javascript:", "onerror=", "onload="];

pub struct SanitizeOutcome {
    pub text: String,
    pub flagged: bool,
}

pub fn sanitize_text(input: &str, field: &str) -> SanitizeOutcome {
    let lower = input.to_ascii_lowercase();
    let flagged = INJECTION_SIGNATURES.iter().any(|sig| lower.contains(sig));

    let without_control_chars: String = input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    if flagged {
        tracing::warn!(field, "inbound text matched an injection signature");
    }

    SanitizeOutcome {
        text: without_control_chars,
        flagged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_script_tags() {
        let outcome = sanitize_text("hello <script>alert(1)</script>", "text");
        assert!(outcome.flagged);
    }

    #[test]
    fn flags_javascript_uri_scheme() {
        let outcome = sanitize_text("javascript:alert(1)", "text");
        assert!(outcome.flagged);
    }

    #[test]
    fn does_not_flag_plain_text() {
        let outcome = sanitize_text("I am satisfied with my purchase", "text");
        assert!(!outcome.flagged);
    }

    #[test]
    fn strips_control_characters_but_keeps_newlines() {
        let outcome = sanitize_text("line one\nline\x07two", "text");
        assert!(outcome.text.contains('\n'));
        assert!(!outcome.text.contains('\u{7}'));
    }
}
