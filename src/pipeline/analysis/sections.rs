use super::types::AnalysisSections;

pub const SUMMARY_MARKER: &str = "🎯";
pub const BREAKDOWN_MARKER: &str = "🔍";
pub const EXPLANATION_MARKER: &str = "💡";
pub const ACTIONS_MARKER: &str = "📋";
pub const QUESTIONS_MARKER: &str = "❓";
/// Matched without the emoji variation selector, so both `⚠` and `⚠️` count.
pub const SAFETY_MARKER: &str = "⚠";

/// Split a model answer into its six sections.
///
/// Each section runs from just after its marker to the next section's marker
/// (searched from the start marker onward) or to the end of the text. The
/// marker itself is not part of the section body; callers that render
/// headings add their own. A missing marker gives an empty section. Never
/// fails.
pub fn parse_sections(text: &str) -> AnalysisSections {
    AnalysisSections {
        summary: extract_section(text, SUMMARY_MARKER, Some(BREAKDOWN_MARKER)),
        breakdown: extract_section(text, BREAKDOWN_MARKER, Some(EXPLANATION_MARKER)),
        explanation: extract_section(text, EXPLANATION_MARKER, Some(ACTIONS_MARKER)),
        actions: extract_section(text, ACTIONS_MARKER, Some(QUESTIONS_MARKER)),
        questions: extract_section(text, QUESTIONS_MARKER, Some(SAFETY_MARKER)),
        safety: extract_section(text, SAFETY_MARKER, None),
    }
}

fn extract_section(text: &str, start_marker: &str, end_marker: Option<&str>) -> String {
    let Some(start) = text.find(start_marker) else {
        return String::new();
    };
    let body_start = start + start_marker.len();
    let rest = &text[body_start..];

    let body = match end_marker.and_then(|m| rest.find(m)) {
        Some(end) => &rest[..end],
        None => rest,
    };

    body.trim_start_matches('\u{fe0f}').trim().to_string()
}
