use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::patterns::redaction_passes;
use super::PhiKind;

/// Per-category substitution counts from one sanitize run.
/// Counts only, never matched text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionStats {
    counts: BTreeMap<&'static str, usize>,
}

impl RedactionStats {
    fn record(&mut self, kind: PhiKind, n: usize) {
        if n > 0 {
            *self.counts.entry(kind.as_str()).or_insert(0) += n;
        }
    }

    pub fn count(&self, kind: PhiKind) -> usize {
        self.counts.get(kind.as_str()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Strip identifying details from document text.
///
/// Total: never fails, worst case returns the (trimmed) input unchanged.
/// Passes run in a fixed order (names, identifiers, date of birth,
/// addresses, contact details) so a later pass never re-reads a span an
/// earlier one claimed, e.g. a ten-digit run is already an identifier
/// before the phone pattern sees it.
pub fn sanitize(text: &str) -> String {
    sanitize_with_stats(text).0
}

/// [`sanitize`], also reporting how many substitutions each category made.
pub fn sanitize_with_stats(text: &str) -> (String, RedactionStats) {
    let mut stats = RedactionStats::default();
    if text.is_empty() {
        return (String::new(), stats);
    }

    let mut current = text.to_string();
    for pass in redaction_passes() {
        for rule in pass {
            let hits = rule.regex.find_iter(&current).count();
            if hits == 0 {
                continue;
            }
            stats.record(rule.kind, hits);
            current = rule
                .regex
                .replace_all(&current, rule.replacement)
                .into_owned();
        }
    }

    (current.trim().to_string(), stats)
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:[A-Z]+_)?REDACTED\]").expect("valid placeholder regex"));

/// Sanitized text with every placeholder token removed and whitespace
/// collapsed. What is left is the content a model could actually explain.
pub fn residual_text(sanitized: &str) -> String {
    PLACEHOLDER
        .replace_all(sanitized, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
