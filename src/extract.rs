//! PDF text extraction for uploaded documents.
//!
//! Documents arrive as raw bytes; this module returns a [`DocumentText`]
//! with per-page text preserved so chunk offsets can be mapped back to page
//! numbers. A page with no text content contributes an empty entry and is
//! skipped downstream; a document that yields no text at all is rejected
//! here so indexing fails before any embedding call is made.

use thiserror::Error;

use crate::models::DocumentText;

/// Extraction error. The pipeline reports it and leaves session state as is.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("document contains no extractable text")]
    NoText,
}

/// Extracts per-page plain text from PDF bytes.
///
/// Returns [`ExtractError::NoText`] when every page is empty or
/// whitespace-only.
pub fn extract_document(bytes: &[u8]) -> Result<DocumentText, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let doc = DocumentText::new(pages);
    if doc.is_blank() {
        return Err(ExtractError::NoText);
    }
    Ok(doc)
}
