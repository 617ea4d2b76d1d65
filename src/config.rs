use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "DocTalk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest upload accepted by the pre-flight check (10 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Extracted text with fewer words than this is treated as a failed extraction.
pub const MIN_EXTRACTED_WORDS: usize = 5;

/// Sanitized text shorter than this (trimmed, in characters) is not sent for analysis.
pub const MIN_SANITIZED_CHARS: usize = 10;

/// Model responses shorter than this (in characters) are rejected as incomplete.
pub const MIN_ANALYSIS_CHARS: usize = 50;

/// Length of the sanitized-input prefix kept on an analysis result.
pub const SNIPPET_CHARS: usize = 200;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_OCR_URL: &str = "http://localhost:11434";
pub const DEFAULT_OCR_MODEL: &str = "medgemma:4b";
pub const DEFAULT_OCR_LANG: &str = "eng";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "doctalk=info,warn"
}

/// Runtime configuration, resolved from the environment.
///
/// A missing API key is not an error here. The analysis service reports it
/// as an authentication failure when a call is attempted.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout: Duration,
    pub ocr_url: String,
    pub ocr_model: String,
    pub ocr_lang: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_timeout: Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS),
            ocr_url: DEFAULT_OCR_URL.to_string(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let gemini_timeout = match get("GEMINI_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %value, "Invalid GEMINI_TIMEOUT_SECS, using default");
                    defaults.gemini_timeout
                }
            },
            None => defaults.gemini_timeout,
        };

        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_API_BASE").unwrap_or(defaults.gemini_base_url),
            gemini_timeout,
            ocr_url: get("DOCTALK_OCR_URL").unwrap_or(defaults.ocr_url),
            ocr_model: get("DOCTALK_OCR_MODEL").unwrap_or(defaults.ocr_model),
            ocr_lang: get("DOCTALK_OCR_LANG").unwrap_or(defaults.ocr_lang),
        }
    }
}
