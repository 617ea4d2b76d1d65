//! Analysis service: sanitized text in, structured plain-language
//! explanation out.
//!
//! Redaction always happens here, immediately before the prompt is built,
//! so nothing reaches the remote model that has not gone through
//! [`crate::pipeline::privacy::sanitize`].

pub mod types;
pub mod prompt;
pub mod sections;
pub mod gemini;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use sections::*;
pub use gemini::*;
pub use orchestrator::*;

use thiserror::Error;

/// Coarse category of a remote failure, for differentiated guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    InvalidRequest,
    Authentication,
    AccessDenied,
    RateLimited,
    UpstreamUnavailable,
    UnknownStatus,
    MalformedResponse,
    Unreachable,
    RequestConstruction,
}

#[derive(Error, Debug)]
pub enum RemoteServiceError {
    #[error("Invalid API request: {0}")]
    InvalidRequest(String),

    #[error("Invalid API key. Please check your Gemini API key configuration.")]
    InvalidApiKey,

    #[error("Gemini API key is not configured. Set GEMINI_API_KEY and try again.")]
    MissingApiKey,

    #[error("API access denied. Please check your API key permissions and billing.")]
    AccessDenied,

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited,

    #[error("Google AI service is temporarily unavailable.")]
    Unavailable,

    #[error("API error {status}: {message}")]
    UnknownStatus { status: u16, message: String },

    #[error("Invalid response format from AI service: {0}")]
    MalformedResponse(String),

    #[error("Unable to reach Google AI service. Please check your internet connection.")]
    Unreachable { reason: String },

    #[error("Request configuration error: {0}")]
    RequestConstruction(String),
}

impl RemoteServiceError {
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            Self::InvalidRequest(_) => RemoteErrorKind::InvalidRequest,
            Self::InvalidApiKey | Self::MissingApiKey => RemoteErrorKind::Authentication,
            Self::AccessDenied => RemoteErrorKind::AccessDenied,
            Self::RateLimited => RemoteErrorKind::RateLimited,
            Self::Unavailable => RemoteErrorKind::UpstreamUnavailable,
            Self::UnknownStatus { .. } => RemoteErrorKind::UnknownStatus,
            Self::MalformedResponse(_) => RemoteErrorKind::MalformedResponse,
            Self::Unreachable { .. } => RemoteErrorKind::Unreachable,
            Self::RequestConstruction(_) => RemoteErrorKind::RequestConstruction,
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient medical text for analysis after privacy filtering.")]
    InsufficientSanitizedText { chars: usize },

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    #[error("AI analysis appears incomplete. Please try again.")]
    IncompleteAnalysis { chars: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_share_a_kind() {
        assert_eq!(RemoteServiceError::InvalidApiKey.kind(), RemoteErrorKind::Authentication);
        assert_eq!(RemoteServiceError::MissingApiKey.kind(), RemoteErrorKind::Authentication);
    }

    #[test]
    fn messages_are_distinct() {
        let messages = [
            RemoteServiceError::InvalidApiKey.to_string(),
            RemoteServiceError::AccessDenied.to_string(),
            RemoteServiceError::RateLimited.to_string(),
            RemoteServiceError::Unavailable.to_string(),
            RemoteServiceError::Unreachable { reason: "timeout".into() }.to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn remote_error_message_passes_through_analysis_error() {
        let err = AnalysisError::from(RemoteServiceError::RateLimited);
        assert_eq!(err.to_string(), "Rate limit exceeded. Please wait a moment and try again.");
    }
}
