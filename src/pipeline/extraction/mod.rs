pub mod types;
pub mod validate;
pub mod cleanup;
pub mod ocr;
pub mod pdf;
pub mod text;
pub mod orchestrator;

pub use types::*;
pub use validate::*;
pub use cleanup::*;
pub use ocr::*;
pub use pdf::*;
pub use text::*;
pub use orchestrator::*;

use thiserror::Error;

/// Pre-flight rejections, raised before any I/O or engine call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type. Please upload images (JPEG, PNG, etc.), PDFs, or text files.")]
    UnsupportedType,

    #[error("File size too large. Please upload files smaller than 10MB.")]
    FileTooLarge { size: u64 },

    #[error("File appears to be empty.")]
    EmptyFile,
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type. Please upload images, PDFs, or text files.")]
    UnsupportedFormat,

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read text from image. Please ensure the image is clear and contains visible text.")]
    OcrFailure(#[source] OcrError),

    #[error("Failed to read PDF. The file appears to be corrupted or is not a valid PDF.")]
    PdfCorrupted { reason: String },

    #[error("This PDF has no text layer; it looks like a scanned image. Text recognition is not run on PDF pages automatically, so please upload the pages as images instead.")]
    PdfImageOnly,

    #[error("No text could be extracted from the document. Please try a clearer image or different file.")]
    NoText,

    #[error("Very little text was extracted ({words} words). The document may be unclear or contain mostly non-text elements.")]
    InsufficientText { words: usize },

    #[error("Text extraction task failed: {0}")]
    Task(String),
}

/// Failures reported by an OCR engine. Wrapped in
/// [`ExtractionError::OcrFailure`] by the image handler.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR service is not reachable at {0}")]
    Unreachable(String),

    #[error("OCR service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Malformed OCR response: {0}")]
    MalformedResponse(String),

    #[error("OCR engine error: {0}")]
    Engine(String),
}
