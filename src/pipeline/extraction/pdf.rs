use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::types::{Document, ProgressFn, TextExtractor};
use super::ExtractionError;

/// Concurrent parses allowed on the blocking pool.
const MAX_CONCURRENT_PARSES: usize = 2;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Text-layer PDF parser. One per process, created on first use.
pub struct PdfParser {
    permits: Semaphore,
}

static PDF_PARSER: OnceLock<PdfParser> = OnceLock::new();

/// The shared parser. Initialised lazily; later calls reuse it.
pub fn pdf_parser() -> &'static PdfParser {
    PDF_PARSER.get_or_init(|| {
        tracing::info!(max_concurrent = MAX_CONCURRENT_PARSES, "PDF parser initialised");
        PdfParser {
            permits: Semaphore::new(MAX_CONCURRENT_PARSES),
        }
    })
}

impl PdfParser {
    /// Read the embedded text layer, page by page.
    ///
    /// Parsing is CPU-bound and runs on the blocking pool. A parser panic
    /// counts as a corrupted file. No OCR fallback: a PDF without a text
    /// layer is reported as [`ExtractionError::PdfImageOnly`].
    pub async fn extract_text(&self, document: &Document) -> Result<String, ExtractionError> {
        let bytes = document.shared_bytes();
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::PdfCorrupted {
                reason: "missing %PDF header".into(),
            });
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))?;

        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                ExtractionError::PdfCorrupted {
                    reason: "parser panicked".into(),
                }
            } else {
                ExtractionError::Task(e.to_string())
            }
        })?
        .map_err(|e| ExtractionError::PdfCorrupted {
            reason: e.to_string(),
        })?;

        let page_count = pages.len();
        let empty_pages = pages.iter().filter(|p| p.trim().is_empty()).count();
        tracing::debug!(page_count, empty_pages, "PDF text layer read");

        let text = pages.join("\n\n");
        if text.trim().is_empty() {
            return Err(ExtractionError::PdfImageOnly);
        }
        Ok(text)
    }
}

/// PDF handler.
pub struct PdfExtractor;

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(
        &self,
        document: &Document,
        progress: &ProgressFn<'_>,
    ) -> Result<String, ExtractionError> {
        let text = pdf_parser().extract_text(document).await?;
        progress(1.0);
        Ok(text)
    }
}
