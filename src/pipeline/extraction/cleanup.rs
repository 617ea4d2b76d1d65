use std::sync::LazyLock;

use regex::Regex;

use crate::config::MIN_EXTRACTED_WORDS;

use super::ExtractionError;

static BLANK_LINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("valid regex"));

static INLINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Normalise raw extractor output and reject text too short to analyse.
///
/// Same rules for every encoding:
/// 1. CRLF becomes LF, control characters other than newline and tab are dropped
/// 2. three or more line breaks (with whitespace between) collapse to one blank line
/// 3. runs of non-newline whitespace collapse to a single space
/// 4. leading and trailing whitespace is trimmed
pub fn clean_extracted_text(raw: &str) -> Result<String, ExtractionError> {
    if raw.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }

    let normalized: String = raw
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let collapsed = BLANK_LINE_RUN.replace_all(&normalized, "\n\n");
    let collapsed = INLINE_WHITESPACE.replace_all(&collapsed, " ");
    let cleaned = collapsed.trim().to_string();

    if cleaned.is_empty() {
        return Err(ExtractionError::NoText);
    }

    let words = word_count(&cleaned);
    if words < MIN_EXTRACTED_WORDS {
        return Err(ExtractionError::InsufficientText { words });
    }

    Ok(cleaned)
}
