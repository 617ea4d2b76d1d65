use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RemoteServiceError;

/// Document category hint. Only changes prompt framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisContext {
    Lab,
    Discharge,
    Prescription,
    Radiology,
    #[default]
    General,
}

impl AnalysisContext {
    /// Guess the category from a filename, case-insensitively.
    /// First matching rule wins; nothing matching means `General`.
    pub fn from_filename(name: &str) -> Self {
        let name = name.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

        if has(&["lab", "test", "blood"]) {
            Self::Lab
        } else if has(&["discharge", "summary"]) {
            Self::Discharge
        } else if has(&["prescription", "med"]) {
            Self::Prescription
        } else if has(&["xray", "mri", "ct", "scan"]) {
            Self::Radiology
        } else {
            Self::General
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Lab => "Laboratory test results (blood tests, urine tests, etc.)",
            Self::Discharge => "Hospital discharge summary or clinical notes",
            Self::Prescription => "Medication instructions or prescription details",
            Self::Radiology => "Imaging reports (X-ray, MRI, CT scan)",
            Self::General => "General medical report or health document",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lab => "lab",
            Self::Discharge => "discharge",
            Self::Prescription => "prescription",
            Self::Radiology => "radiology",
            Self::General => "general",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub context: Option<AnalysisContext>,
}

impl AnalysisOptions {
    pub fn with_context(context: AnalysisContext) -> Self {
        Self {
            context: Some(context),
        }
    }
}

/// The six named parts of a model answer. Missing parts are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSections {
    pub summary: String,
    pub breakdown: String,
    pub explanation: String,
    pub actions: String,
    pub questions: String,
    pub safety: String,
}

/// A finished analysis. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Model output, with the safety disclaimer appended when it had none.
    pub raw_analysis: String,
    pub structured: AnalysisSections,
    /// Leading part of the sanitized input.
    pub original_text_snippet: String,
    pub timestamp: DateTime<Utc>,
    /// Word count of the sanitized input.
    pub word_count: usize,
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Low-variance settings for patient-facing explanations.
    pub const fn medical() -> Self {
        Self {
            temperature: 0.2,
            top_k: 40,
            top_p: 0.8,
            max_output_tokens: 4096,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::medical()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub config: GenerationConfig,
}

/// Remote text-generation abstraction (allows mocking for tests)
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, RemoteServiceError>;
}
