//! Text helpers for model-facing strings

/// Truncate to at most `max_chars` characters, appending a marker when cut
///
/// Counts `char`s rather than bytes so CJK text is never split mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...(truncated)", &text[..byte_idx]),
    }
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```)
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Single-line preview for log fields
pub fn preview(text: &str, max_chars: usize) -> String {
    truncate_chars(&text.replace('\n', " "), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[test]
    fn test_truncate_multibyte() {
        let cut = truncate_chars("贵州茅台股份", 2);
        assert_eq!(cut, "贵州...(truncated)");
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_preview_flattens_newlines() {
        assert_eq!(preview("a\nb", 10), "a b");
    }
}
