use super::patterns::{redaction_passes, DETECTION_ONLY};

/// Report whether `text` contains anything the redaction passes (or the
/// stricter detection-only shapes) would flag. Never mutates.
///
/// Used for diagnostics: callers can log or branch on it without paying for
/// a full sanitize.
pub fn has_sensitive_info(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }

    redaction_passes()
        .iter()
        .flat_map(|pass| pass.iter())
        .any(|rule| rule.regex.is_match(text))
        || DETECTION_ONLY.iter().any(|re| re.is_match(text))
}
