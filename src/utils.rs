//! Common utility functions shared across the codebase.

/// Normalize line endings to `\n`, as required on every file write.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Truncate a string to at most `max_chars` characters, respecting char
/// boundaries (used for quarantine markers and diagnostic previews).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use crate::utils::*;

    #[test]
    fn test_normalize_line_endings_crlf() {
        assert_eq!(normalize_line_endings("a\r\nb\r\nc"), "a\nb\nc");
    }

    #[test]
    fn test_normalize_line_endings_cr_only() {
        assert_eq!(normalize_line_endings("a\rb"), "a\nb");
    }

    #[test]
    fn test_normalize_line_endings_noop() {
        assert_eq!(normalize_line_endings("a\nb\n"), "a\nb\n");
    }

    #[test]
    fn test_truncate_chars_shorter_than_limit() {
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_truncate_chars_respects_unicode() {
        assert_eq!(truncate_chars("héllo world", 3), "hél");
    }
}
