use crate::config::MAX_FILE_SIZE_BYTES;

use super::{Document, ValidationError};

/// Declared types accepted by pre-flight validation.
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/bmp",
    "image/gif",
    "application/pdf",
    "text/plain",
];

/// Cheap checks run before any extraction work.
///
/// Order matters: type first, then size ceiling, then emptiness, so a
/// zero-byte file of an unknown type reports the type problem.
pub fn validate_file(document: &Document) -> Result<(), ValidationError> {
    let media_type = document.media_type.to_ascii_lowercase();
    let name = document.name.to_lowercase();

    let type_ok = SUPPORTED_MEDIA_TYPES.contains(&media_type.as_str())
        || name.ends_with(".pdf")
        || name.ends_with(".txt");
    if !type_ok {
        return Err(ValidationError::UnsupportedType);
    }

    if document.size > MAX_FILE_SIZE_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: document.size,
        });
    }

    if document.size == 0 {
        return Err(ValidationError::EmptyFile);
    }

    Ok(())
}
