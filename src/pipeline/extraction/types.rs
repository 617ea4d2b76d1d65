use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ExtractionError, OcrError};

/// Progress callback: receives a fraction in `[0.0, 1.0]`.
///
/// Carries a lifetime so callers can pass closures that borrow local state.
pub type ProgressFn<'a> = dyn Fn(f32) + Send + Sync + 'a;

/// An uploaded file: payload plus the declared media type and name.
///
/// Lives for one pipeline run. The payload is shared, so cloning is cheap.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub name: String,
    /// Declared media type, e.g. `image/png`. May be empty when unknown.
    pub media_type: String,
    pub size: u64,
    #[serde(skip)]
    bytes: Arc<[u8]>,
}

impl Document {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// Read a file from disk, guessing the declared type from its extension.
    pub async fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the payload, for moving into blocking tasks.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }
}

/// The three encodings the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Pdf,
    PlainText,
}

impl MediaKind {
    /// Classify a document by declared type, with a filename-suffix fallback
    /// for PDF and text. Images are recognised by declared type only.
    pub fn detect(document: &Document) -> Option<Self> {
        let media_type = document.media_type.to_ascii_lowercase();
        let name = document.name.to_lowercase();

        if media_type.starts_with("image/") {
            Some(Self::Image)
        } else if media_type == "application/pdf" || name.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if media_type == "text/plain" || name.ends_with(".txt") {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::PlainText => "plain_text",
        }
    }
}

/// Text recovered from a document, after cleanup and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub word_count: usize,
    pub kind: MediaKind,
}

impl ExtractedText {
    pub fn new(text: String, kind: MediaKind) -> Self {
        let word_count = super::cleanup::word_count(&text);
        Self {
            text,
            word_count,
            kind,
        }
    }
}

/// OCR engine abstraction (allows mocking for tests)
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise text in an encoded image. `lang` is an ISO 639-2 code
    /// such as `eng`. Progress fractions are reported while recognition runs.
    async fn recognize(
        &self,
        image_bytes: &[u8],
        lang: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<String, OcrError>;
}

/// Per-encoding extractor. Returns raw text; cleanup and validation are
/// applied once by the orchestrator.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        document: &Document,
        progress: &ProgressFn<'_>,
    ) -> Result<String, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, media_type: &str) -> Document {
        Document::new(name, media_type, b"x".to_vec())
    }

    #[test]
    fn detects_by_declared_type() {
        assert_eq!(MediaKind::detect(&doc("scan", "image/png")), Some(MediaKind::Image));
        assert_eq!(MediaKind::detect(&doc("scan", "image/webp")), Some(MediaKind::Image));
        assert_eq!(MediaKind::detect(&doc("r", "application/pdf")), Some(MediaKind::Pdf));
        assert_eq!(MediaKind::detect(&doc("r", "text/plain")), Some(MediaKind::PlainText));
    }

    #[test]
    fn falls_back_to_suffix_for_pdf_and_text() {
        assert_eq!(MediaKind::detect(&doc("Report.PDF", "")), Some(MediaKind::Pdf));
        assert_eq!(
            MediaKind::detect(&doc("notes.txt", "application/octet-stream")),
            Some(MediaKind::PlainText)
        );
    }

    #[test]
    fn image_suffix_alone_is_not_enough() {
        assert_eq!(MediaKind::detect(&doc("photo.png", "")), None);
        assert_eq!(MediaKind::detect(&doc("sheet.xlsx", "application/vnd.ms-excel")), None);
    }

    #[test]
    fn document_records_size() {
        let d = Document::new("a.txt", "text/plain", vec![0u8; 42]);
        assert_eq!(d.size, 42);
        assert_eq!(d.bytes().len(), 42);
    }

    #[test]
    fn extracted_text_counts_words() {
        let t = ExtractedText::new("one two  three\nfour".into(), MediaKind::PlainText);
        assert_eq!(t.word_count, 4);
    }

    #[test]
    fn progress_callback_can_borrow_locals() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        fn drive(progress: &ProgressFn<'_>) {
            progress(0.5);
            progress(1.0);
        }

        let calls = AtomicUsize::new(0);
        let report = |_fraction: f32| {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        drive(&report);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn from_path_guesses_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab_results.txt");
        std::fs::write(&path, "Potassium 4.2 mmol/L").unwrap();

        let d = Document::from_path(&path).await.unwrap();
        assert_eq!(d.name, "lab_results.txt");
        assert_eq!(d.media_type, "text/plain");
        assert_eq!(d.size, 20);
    }

    #[tokio::test]
    async fn from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Document::from_path(&dir.path().join("absent.pdf")).await;
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}
