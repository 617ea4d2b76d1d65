//! Client-side redaction of personally identifying details.
//!
//! Runs before any text leaves the process. Pattern-based, not NLP-based:
//! unusual name formats and non-US identifier or phone shapes are missed.
//! That is a known limitation, not something later passes try to repair.

pub mod patterns;
pub mod redact;
pub mod detect;

pub use detect::has_sensitive_info;
pub use redact::{residual_text, sanitize, sanitize_with_stats, RedactionStats};

use serde::{Deserialize, Serialize};

/// Category of identifying detail a pattern targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhiKind {
    Name,
    Identifier,
    DateOfBirth,
    Address,
    Contact,
}

impl PhiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Identifier => "identifier",
            Self::DateOfBirth => "date_of_birth",
            Self::Address => "address",
            Self::Contact => "contact",
        }
    }
}
