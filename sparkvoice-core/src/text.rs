use regex::Regex;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn noise_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Recognizers sometimes emit bracketed markers like "[noise]" or "(wind)".
        Regex::new(r"\[[^\]]*\]|\([^\)]*\)").expect("valid noise marker regex")
    })
}

/// Cleans a recognizer transcript before classification.
///
/// - removes bracketed noise markers
/// - collapses any whitespace run (tabs, newlines) to a single space
/// - trims
pub fn normalize_transcript(text: &str) -> String {
    let out = noise_marker_re().replace_all(text, " ");
    let out = whitespace_re().replace_all(&out, " ");
    out.trim().to_string()
}

/// Returns the transcript only if it carries non-whitespace content.
pub fn non_empty_transcript(text: &str) -> Option<String> {
    let normalized = normalize_transcript(text);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
