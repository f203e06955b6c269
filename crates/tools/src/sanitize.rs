//! Error-text sanitization for tool results: strip file paths,
//! stack frames, source positions, and internal module references; truncate
//! to ~200 characters; fall back to a generic message if nothing usable
//! survives. Pure function, its own unit tests.

const MAX_LEN: usize = 200;
const FALLBACK: &str = "the tool call failed";

pub fn sanitize_error_text(raw: &str) -> String {
    let cleaned: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !looks_like_stack_frame(line))
        .map(|line| strip_source_position(&line))
        .collect();

    let joined = cleaned.join(" ");
    let joined = strip_module_paths(&joined);
    let trimmed = joined.trim();

    if trimmed.is_empty() {
        return FALLBACK.to_string();
    }

    truncate_chars(trimmed, MAX_LEN)
}

fn looks_like_stack_frame(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("at ")
        || lower.starts_with("0:")
        || lower.contains(".rs:")
        || line.starts_with('/')
        || line.contains(":\\")
        || lower.contains("backtrace")
        || lower.contains("panicked at")
}

/// Strips trailing `file.rs:123:45`-style source positions from a line,
/// keeping any leading message text.
fn strip_source_position(line: &&str) -> String {
    if let Some(idx) = line.find(".rs:") {
        line[..idx].trim_end().to_string()
    } else {
        line.to_string()
    }
}

/// Collapses `some::internal::module::Path` references down to their final
/// segment so error text never leaks internal module structure.
fn strip_module_paths(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            if word.contains("::") {
                word.rsplit("::").next().unwrap_or(word)
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_absolute_file_paths_from_stack_lines() {
        let raw = "handler failed\n   at /home/user/src/tool.rs:42:5\nstack backtrace:\n   0: std::panicking";
        let sanitized = sanitize_error_text(raw);
        assert!(!sanitized.contains("/home"));
        assert!(!sanitized.contains(".rs:"));
        assert!(sanitized.contains("handler failed"));
    }

    #[test]
    fn strips_internal_module_references() {
        let raw = "vsg_tools::handlers::record_response failed validation";
        let sanitized = sanitize_error_text(raw);
        assert!(!sanitized.contains("::"));
        assert!(sanitized.contains("failed validation"));
    }

    #[test]
    fn truncates_long_messages() {
        let raw = "x".repeat(500);
        let sanitized = sanitize_error_text(&raw);
        assert!(sanitized.chars().count() <= MAX_LEN + 3);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn falls_back_to_generic_message_when_nothing_survives() {
        let raw = "   at /a/b.rs:1:1\nstack backtrace:\n0: foo";
        assert_eq!(sanitize_error_text(raw), FALLBACK);
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(sanitize_error_text(""), FALLBACK);
        assert_eq!(sanitize_error_text("   "), FALLBACK);
    }
}
