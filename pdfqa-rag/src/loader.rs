//! PDF text extraction.
//!
//! This module is only available when the `pdf` feature is enabled.

use std::path::Path;

use tracing::{error, info};

use crate::document::Document;
use crate::error::{RagError, Result};

/// Read the PDF at `path` into a [`Document`].
///
/// Extracted text is split into page segments at form feeds when the
/// extractor emits them; otherwise the whole text is one segment. Windows
/// line endings are normalised so paragraph breaks are detected.
///
/// # Errors
///
/// Returns [`RagError::DocumentError`] if the file cannot be read or parsed,
/// or contains no extractable text.
pub fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    info!(path = %path_str, "reading PDF file");

    let bytes = std::fs::read(path).map_err(|e| {
        error!(path = %path_str, error = %e, "failed to read PDF");
        RagError::DocumentError { path: path_str.clone(), message: e.to_string() }
    })?;

    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        error!(path = %path_str, error = %e, "failed to parse PDF");
        RagError::DocumentError { path: path_str.clone(), message: format!("PDF parse error: {e}") }
    })?;

    let document = Document::from_pages(path_str.clone(), split_pages(&text));
    if document.is_blank() {
        return Err(RagError::DocumentError {
            path: path_str,
            message: "no extractable text found".to_string(),
        });
    }

    info!(path = %document.source, segments = document.pages.len(), "PDF loaded");
    Ok(document)
}

/// Split extracted text into page segments at form feed characters.
pub fn split_pages(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n").split('\u{c}').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_form_feed() {
        let pages = split_pages("page one\r\n\r\nmore\u{c}page two\u{c}");
        assert_eq!(pages, vec!["page one\n\nmore", "page two", ""]);
    }

    #[test]
    fn text_without_form_feed_is_one_segment() {
        assert_eq!(split_pages("just text"), vec!["just text"]);
    }

    #[test]
    fn missing_file_is_a_document_error() {
        let err = load_pdf("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, RagError::DocumentError { .. }));
    }
}
