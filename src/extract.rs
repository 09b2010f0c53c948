//! Text extraction for uploaded documents.
//!
//! The upload front end hands the core raw bytes plus a file name; this
//! module turns them into plain UTF-8 text. PDFs are extracted with
//! `pdf-extract`; text-like files pass through. Unsupported extensions
//! are an error the caller reports as a failed upload, never a panic.

use std::path::Path;

/// Extraction error. The ingest pipeline maps this into an ingest
/// failure for the offending document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("file is not valid UTF-8")]
    InvalidUtf8,
}

/// Extract plain text from a document's raw bytes, dispatching on the
/// file name's extension.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => extract_pdf(bytes),
        "txt" | "md" | "markdown" => String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractError::InvalidUtf8),
        other => Err(ExtractError::UnsupportedFileType(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text("notes.txt", b"hello world").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_markdown_passthrough() {
        let text = extract_text("brief.md", b"# Heading\n\nBody.").unwrap();
        assert!(text.starts_with("# Heading"));
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert!(extract_text("NOTES.TXT", b"ok").is_ok());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = extract_text("image.png", &[0x89, 0x50]).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType(_)));
    }

    #[test]
    fn test_missing_extension() {
        let err = extract_text("README", b"text").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType(_)));
    }

    #[test]
    fn test_invalid_utf8_text_file() {
        let err = extract_text("notes.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidUtf8));
    }

    #[test]
    fn test_garbage_pdf_errors_not_panics() {
        let err = extract_text("broken.pdf", b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
