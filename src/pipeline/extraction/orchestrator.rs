use std::sync::Arc;

use super::cleanup::clean_extracted_text;
use super::ocr::{ImageExtractor, OllamaVisionOcr};
use super::pdf::PdfExtractor;
use super::text::PlainTextExtractor;
use super::types::{Document, ExtractedText, MediaKind, OcrEngine, ProgressFn, TextExtractor};
use super::validate::validate_file;
use super::{ExtractionError, OcrError, ValidationError};
use crate::config::AppConfig;

/// Turns a document into cleaned, validated text.
///
/// The media kind is resolved once and routed to one handler per
/// encoding. Every handler's output goes through the same cleanup and
/// minimum-word check.
pub struct DocumentExtractor {
    image: ImageExtractor,
    pdf: PdfExtractor,
    text: PlainTextExtractor,
}

impl DocumentExtractor {
    pub fn new(ocr_engine: Arc<dyn OcrEngine>, ocr_lang: &str) -> Self {
        Self {
            image: ImageExtractor::new(ocr_engine, ocr_lang),
            pdf: PdfExtractor,
            text: PlainTextExtractor,
        }
    }

    /// Extractor wired to the configured Ollama vision model.
    pub fn from_config(config: &AppConfig) -> Result<Self, OcrError> {
        let engine = OllamaVisionOcr::from_config(config)?;
        Ok(Self::new(Arc::new(engine), &config.ocr_lang))
    }

    pub fn validate_file(&self, document: &Document) -> Result<(), ValidationError> {
        validate_file(document)
    }

    pub async fn extract_text_from_file(
        &self,
        document: &Document,
    ) -> Result<ExtractedText, ExtractionError> {
        self.extract_with_progress(document, &|_| {}).await
    }

    /// Extract text, reporting handler progress as a fraction in `[0, 1]`.
    pub async fn extract_with_progress(
        &self,
        document: &Document,
        progress: &ProgressFn<'_>,
    ) -> Result<ExtractedText, ExtractionError> {
        let kind = MediaKind::detect(document).ok_or(ExtractionError::UnsupportedFormat)?;
        let start = std::time::Instant::now();

        tracing::info!(
            kind = kind.as_str(),
            size = document.size,
            "Starting text extraction"
        );

        let handler: &dyn TextExtractor = match kind {
            MediaKind::Image => &self.image,
            MediaKind::Pdf => &self.pdf,
            MediaKind::PlainText => &self.text,
        };

        let result = async {
            let raw = handler.extract(document, progress).await?;
            clean_extracted_text(&raw)
        }
        .await;

        match result {
            Ok(text) => {
                let extracted = ExtractedText::new(text, kind);
                tracing::info!(
                    kind = kind.as_str(),
                    word_count = extracted.word_count,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "Text extraction complete"
                );
                Ok(extracted)
            }
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), error = %e, "Text extraction failed");
                Err(e)
            }
        }
    }
}
