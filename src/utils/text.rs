use once_cell::sync::Lazy;
use regex::Regex;

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
static THINK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?think>").expect("valid regex"));
static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Drops reasoning blocks the model leaks into its answer and tidies whitespace.
pub fn clean_response_text(text: &str) -> String {
    let cleaned = THINK_BLOCK.replace_all(text, "");
    let cleaned = THINK_TAG.replace_all(&cleaned, "");
    let cleaned = EXTRA_NEWLINES.replace_all(&cleaned, "\n\n");
    cleaned.trim().to_string()
}

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json").trim_end_matches("```").trim().to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```").trim_end_matches("```").trim().to_string()
    } else {
        s.to_string()
    }
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
