//! Plain-text extraction for uploaded documents.
//!
//! PDFs go through `pdf-extract`; every other file is read as UTF-8 text.
//! The retrieval engine only ever sees the extracted string.

use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug)]
pub enum ExtractError {
    Io(std::io::Error),
    Pdf(String),
    NotUtf8,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "failed to read document: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::NotUtf8 => write!(f, "document is not valid UTF-8 text"),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Guess the content type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => MIME_PDF,
        _ => MIME_TEXT,
    }
}

/// Extract text from in-memory bytes.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    if content_type == MIME_PDF {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotUtf8)
    }
}

/// Read `path` and return its text content.
pub fn load_document_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(ExtractError::Io)?;
    let text = extract_text(&bytes, content_type_for(path))?;
    tracing::debug!(
        path = %path.display(),
        chars = text.chars().count(),
        "extracted document text"
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/b/report.PDF")), MIME_PDF);
        assert_eq!(content_type_for(Path::new("notes.md")), MIME_TEXT);
        assert_eq!(content_type_for(Path::new("README")), MIME_TEXT);
    }

    #[test]
    fn test_load_text_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "Refunds are issued within 30 days.").unwrap();
        let text = load_document_text(file.path()).unwrap();
        assert_eq!(text, "Refunds are issued within 30 days.");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = extract_text(&[0xff, 0xfe, 0x00], MIME_TEXT).unwrap_err();
        assert!(matches!(err, ExtractError::NotUtf8));
    }

    #[test]
    fn test_garbage_pdf_is_error() {
        let err = extract_text(b"not a pdf at all", MIME_PDF).unwrap_err();
        assert!(err.to_string().contains("PDF extraction failed"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_document_text(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }
}
