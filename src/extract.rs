//! Plain-text extraction from reference documents.
//!
//! A document is read page by page and the page texts are concatenated in
//! document order with no separator inserted between pages. PDFs are
//! parsed with `pdf-extract`; plain-text files count as a single page.
//!
//! Every failure (missing file, unreadable bytes, corrupt PDF, unsupported
//! format) surfaces as [`RetrievalError::DocumentRead`]; extraction never
//! panics the caller.

use std::path::Path;

use guide_retrieval_core::{Result, RetrievalError};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// Guess the content type of a document from its extension, falling back
/// to the PDF magic number.
pub fn detect_content_type(path: &Path, bytes: &[u8]) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => Some(MIME_PDF),
        Some("txt") | Some("text") | Some("md") => Some(MIME_TEXT),
        _ if bytes.starts_with(b"%PDF-") => Some(MIME_PDF),
        _ => None,
    }
}

/// Extract the text of every page of the document at `path`, in page order.
pub fn extract_pages(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| read_error(path, e.to_string()))?;

    match detect_content_type(path, &bytes) {
        Some(MIME_PDF) => extract_pdf_pages(path, &bytes),
        Some(_) => {
            let text = String::from_utf8(bytes)
                .map_err(|e| read_error(path, format!("not valid UTF-8: {}", e)))?;
            Ok(vec![text])
        }
        None => Err(read_error(path, "unsupported document format".to_string())),
    }
}

/// Extract the document at `path` as one string.
pub fn extract_document(path: &Path) -> Result<String> {
    Ok(extract_pages(path)?.concat())
}

fn extract_pdf_pages(path: &Path, bytes: &[u8]) -> Result<Vec<String>> {
    // pdf-extract can panic on malformed content streams.
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(read_error(path, format!("PDF extraction failed: {}", e))),
        Err(_) => Err(read_error(path, "PDF extraction panicked".to_string())),
    }
}

fn read_error(path: &Path, reason: String) -> RetrievalError {
    RetrievalError::DocumentRead {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_returns_error() {
        let err = extract_document(Path::new("/nonexistent/guide.pdf")).unwrap_err();
        assert!(matches!(err, RetrievalError::DocumentRead { .. }));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let err = extract_document(&path).unwrap_err();
        assert!(matches!(err, RetrievalError::DocumentRead { .. }));
    }

    #[test]
    fn unsupported_extension_returns_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guide.bin");
        std::fs::write(&path, [0u8, 1, 2, 3]).unwrap();
        let err = extract_document(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn plain_text_is_single_page() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guide.txt");
        std::fs::write(&path, "Se loger\n\nSe nourrir").unwrap();
        let pages = extract_pages(&path).unwrap();
        assert_eq!(pages, vec!["Se loger\n\nSe nourrir".to_string()]);
        assert_eq!(extract_document(&path).unwrap(), "Se loger\n\nSe nourrir");
    }

    #[test]
    fn pdf_magic_detected_without_extension() {
        assert_eq!(
            detect_content_type(Path::new("guide"), b"%PDF-1.4\n"),
            Some(MIME_PDF)
        );
        assert_eq!(detect_content_type(Path::new("guide"), b"hello"), None);
        assert_eq!(
            detect_content_type(Path::new("GUIDE.PDF"), b""),
            Some(MIME_PDF)
        );
    }
}
