use super::sections::{
    ACTIONS_MARKER, BREAKDOWN_MARKER, EXPLANATION_MARKER, QUESTIONS_MARKER, SUMMARY_MARKER,
};
use super::types::AnalysisContext;

/// Characters of sanitized text included in a quick-analysis prompt.
pub const QUICK_PROMPT_CHARS: usize = 500;

/// Full analysis prompt for already-sanitized text.
pub fn build_analysis_prompt(sanitized_text: &str, context: AnalysisContext) -> String {
    format!(
        "You are helping a patient understand a medical document.\n\
         Document type: {description}\n\
         \n\
         Identifying details have already been removed from the text below. \
         Placeholders such as [REDACTED] or [DATE_REDACTED] stand for removed \
         information; leave them as they are and never guess what they hid.\n\
         \n\
         Document text:\n\
         \"\"\"\n\
         {text}\n\
         \"\"\"\n\
         \n\
         Explain this document in simple terms. Use exactly these headings, in this order:\n\
         {summary} Summary: a brief summary of the key findings.\n\
         {breakdown} Breakdown: each result or finding, with the normal or reference range where one is available.\n\
         {explanation} Explanation: simple explanations of the medical terms used.\n\
         {actions} Next steps: general, non-urgent things the patient could do.\n\
         {questions} Questions for your doctor: specific questions to ask at the next appointment.\n\
         ⚠️ Important: a reminder that this explanation is educational only.\n\
         \n\
         Rules:\n\
         - Do not diagnose. Never state that the patient has or does not have a condition.\n\
         - Do not recommend starting, stopping or changing any medication.\n\
         - Use simple language and avoid medical jargon; define any technical term you must use.\n\
         - Be reassuring but honest.\n\
         - The final section must tell the patient to consult their doctor or another \
         healthcare professional before acting on anything in this explanation.\n",
        description = context.description(),
        text = sanitized_text,
        summary = SUMMARY_MARKER,
        breakdown = BREAKDOWN_MARKER,
        explanation = EXPLANATION_MARKER,
        actions = ACTIONS_MARKER,
        questions = QUESTIONS_MARKER,
    )
}

/// Two-to-three sentence explanation prompt over the head of the text.
pub fn build_quick_prompt(sanitized_text: &str) -> String {
    let head: String = sanitized_text.chars().take(QUICK_PROMPT_CHARS).collect();
    format!(
        "Briefly explain this medical information in 2-3 sentences for a patient:\n\
         \"{head}\"\n\
         \n\
         Use simple language and suggest discussing with a doctor."
    )
}
