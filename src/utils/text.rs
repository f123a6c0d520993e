//! Text normalization helpers used across extraction

/// Collapse all runs of whitespace to single spaces and trim the ends.
pub fn sanitize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate `text` to at most `max_len` characters, appending an ellipsis
/// when anything was cut. Consumers detect truncation by comparing the
/// returned length against `max_len`.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len).collect();
    out.push_str("...");
    out
}
