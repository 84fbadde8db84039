//! PDF text extraction via `pdf-extract`, run off the async runtime.

use std::path::Path;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF is password protected")]
    Encrypted,

    #[error("PDF is corrupted or not a PDF: {0}")]
    Corrupted(String),

    #[error("Error extracting text from PDF: {0}")]
    Extraction(String),

    #[error("PDF extraction task failed: {0}")]
    TaskFailed(String),
}

/// Extracts the text of every page of the PDF at `path`.
///
/// A PDF with no extractable text (e.g. a scanned image) is not an error:
/// a warning is logged and an empty string is returned.
pub async fn extract_text_from_pdf(path: &Path) -> Result<String, PdfError> {
    let owned = path.to_path_buf();
    // pdf-extract is CPU-bound and can panic on malformed input; a panic
    // surfaces as a JoinError here.
    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
        .await
        .map_err(|e| PdfError::TaskFailed(e.to_string()))?
        .map_err(|e| classify_error(e.to_string()))?;

    let text = join_pages(&raw);
    if text.is_empty() {
        warn!("Extracted empty text from {}", path.display());
    }
    Ok(text)
}

fn classify_error(message: String) -> PdfError {
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        PdfError::Encrypted
    } else if lower.contains("invalid")
        || lower.contains("malformed")
        || lower.contains("corrupt")
        || lower.contains("header")
        || lower.contains("trailer")
        || lower.contains("xref")
    {
        PdfError::Corrupted(message)
    } else {
        PdfError::Extraction(message)
    }
}

/// pdf-extract separates pages with form feeds. Pages are trimmed, blank
/// pages dropped, and the rest joined one per line block.
fn join_pages(raw: &str) -> String {
    raw.split('\x0c')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
