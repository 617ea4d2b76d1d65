use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;

use super::gemini::GeminiClient;
use super::prompt::{build_analysis_prompt, build_quick_prompt};
use super::sections::parse_sections;
use super::types::{
    AnalysisContext, AnalysisOptions, AnalysisResult, GenerationClient, GenerationConfig,
    GenerationRequest,
};
use super::{AnalysisError, RemoteServiceError};
use crate::config::{AppConfig, MIN_ANALYSIS_CHARS, MIN_SANITIZED_CHARS, SNIPPET_CHARS};
use crate::pipeline::extraction::{word_count, ProgressFn};
use crate::pipeline::privacy::{has_sensitive_info, residual_text, sanitize, sanitize_with_stats};

/// Appended when the model answer carries no doctor-consultation advice.
pub const SAFETY_DISCLAIMER: &str = "\n\n⚠️ **Important**: This analysis is for educational purposes only. Always consult healthcare professionals for medical advice.";

const DISCLAIMER_TERMS: [&str; 3] = ["consult", "doctor", "medical advice"];

/// Append [`SAFETY_DISCLAIMER`] unless the text already mentions one of
/// the disclaimer terms (case-insensitive).
pub fn ensure_disclaimer(mut analysis: String) -> String {
    let lower = analysis.to_lowercase();
    if !DISCLAIMER_TERMS.iter().any(|t| lower.contains(t)) {
        analysis.push_str(SAFETY_DISCLAIMER);
    }
    analysis
}

/// Characters left once redaction placeholders are discounted.
fn informative_chars(sanitized: &str) -> usize {
    residual_text(sanitized).chars().count()
}

fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Sanitize, prompt, call the remote model, validate and structure.
pub struct MedicalAnalyzer {
    client: Arc<dyn GenerationClient>,
}

impl MedicalAnalyzer {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Analyzer wired to the configured Gemini model.
    pub fn from_config(config: &AppConfig) -> Result<Self, RemoteServiceError> {
        Ok(Self::new(Arc::new(GeminiClient::from_config(config)?)))
    }

    pub async fn analyze_medical_text(
        &self,
        text: &str,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.analyze_with_progress(text, options, &|_| {}).await
    }

    /// [`Self::analyze_medical_text`], reporting progress fractions.
    /// The remote call is the only long step; progress jumps around it.
    pub async fn analyze_with_progress(
        &self,
        text: &str,
        options: &AnalysisOptions,
        progress: &ProgressFn<'_>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let context = options.context.unwrap_or_default();
        let span = tracing::info_span!("analyze_medical_text", context = context.as_str());
        self.run_analysis(text, context, progress)
            .instrument(span)
            .await
    }

    async fn run_analysis(
        &self,
        text: &str,
        context: AnalysisContext,
        progress: &ProgressFn<'_>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let flagged = has_sensitive_info(text);
        let (sanitized, stats) = sanitize_with_stats(text);
        tracing::info!(
            input_len = text.len(),
            sanitized_len = sanitized.len(),
            sensitive_detected = flagged,
            redactions = stats.total(),
            "Text sanitized for analysis"
        );

        let chars = informative_chars(&sanitized);
        if chars < MIN_SANITIZED_CHARS {
            tracing::warn!(chars, "Sanitized text too short, skipping remote call");
            return Err(AnalysisError::InsufficientSanitizedText { chars });
        }
        progress(0.1);

        let request = GenerationRequest {
            prompt: build_analysis_prompt(&sanitized, context),
            config: GenerationConfig::medical(),
        };
        let raw = self.client.generate(&request).await.map_err(|e| {
            tracing::warn!(kind = ?e.kind(), "Remote analysis failed");
            AnalysisError::from(e)
        })?;
        progress(0.9);

        let response_chars = raw.trim().chars().count();
        if response_chars < MIN_ANALYSIS_CHARS {
            tracing::warn!(response_chars, "Model answer too short");
            return Err(AnalysisError::IncompleteAnalysis {
                chars: response_chars,
            });
        }

        let raw_analysis = ensure_disclaimer(raw);
        let structured = parse_sections(&raw_analysis);

        let result = AnalysisResult {
            raw_analysis,
            structured,
            original_text_snippet: snippet(&sanitized),
            timestamp: Utc::now(),
            word_count: word_count(&sanitized),
        };

        tracing::info!(
            response_chars,
            word_count = result.word_count,
            "Analysis complete"
        );
        progress(1.0);
        Ok(result)
    }

    /// Short 2-3 sentence explanation of the start of `text`.
    /// Same redaction and disclaimer guarantees as the full analysis.
    pub async fn quick_analysis(&self, text: &str) -> Result<String, AnalysisError> {
        let sanitized = sanitize(text);
        let chars = informative_chars(&sanitized);
        if chars < MIN_SANITIZED_CHARS {
            return Err(AnalysisError::InsufficientSanitizedText { chars });
        }

        let request = GenerationRequest {
            prompt: build_quick_prompt(&sanitized),
            config: GenerationConfig::medical(),
        };
        let raw = self.client.generate(&request).await?;
        if raw.trim().is_empty() {
            return Err(AnalysisError::IncompleteAnalysis { chars: 0 });
        }

        tracing::debug!(response_len = raw.len(), "Quick analysis complete");
        Ok(ensure_disclaimer(raw))
    }
}
