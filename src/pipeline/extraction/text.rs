use async_trait::async_trait;

use super::types::{Document, ProgressFn, TextExtractor};
use super::ExtractionError;

const UTF8_BOM: &str = "\u{feff}";

/// Plain-text handler. Decodes the payload as UTF-8; invalid sequences
/// become U+FFFD rather than failing the run.
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(
        &self,
        document: &Document,
        progress: &ProgressFn<'_>,
    ) -> Result<String, ExtractionError> {
        let decoded = String::from_utf8_lossy(document.bytes());
        if matches!(decoded, std::borrow::Cow::Owned(_)) {
            tracing::warn!(size = document.size, "Text file is not valid UTF-8, replaced invalid bytes");
        }
        let text = decoded.strip_prefix(UTF8_BOM).unwrap_or(&decoded).to_string();
        progress(1.0);
        Ok(text)
    }
}
