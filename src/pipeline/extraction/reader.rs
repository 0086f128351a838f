use std::path::Path;

use super::ExtractionError;

/// Form feed, the page break in plain-text exports.
const PAGE_BREAK: char = '\u{000C}';

/// Document-to-text collaborator: one string per page.
pub trait DocumentReader: Send + Sync {
    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// UTF-8 text; form feeds separate pages.
pub struct PlainTextReader;

impl DocumentReader for PlainTextReader {
    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;
        Ok(text.split(PAGE_BREAK).map(str::to_string).collect())
    }
}

/// Digital PDFs with an embedded text layer.
pub struct PdfTextReader;

impl DocumentReader for PdfTextReader {
    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))
    }
}

/// Join the non-empty pages with `\n`. `Unreadable` when no page has text.
pub fn extract_text(
    reader: &dyn DocumentReader,
    bytes: &[u8],
    source: &str,
) -> Result<String, ExtractionError> {
    let pages = reader.read_pages(bytes)?;
    let page_count = pages.len();
    let text = pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        tracing::warn!(source = %source, pages = page_count, "Document has no readable text");
        return Err(ExtractionError::Unreadable(source.to_string()));
    }

    tracing::debug!(source = %source, pages = page_count, chars = text.len(), "Extracted document text");
    Ok(text)
}

/// Pick a reader by file extension.
pub fn reader_for_path(path: &Path) -> Result<Box<dyn DocumentReader>, ExtractionError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => Ok(Box::new(PdfTextReader)),
        "txt" | "text" | "md" | "markdown" | "tex" | "csv" | "tsv" => Ok(Box::new(PlainTextReader)),
        other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
    }
}

/// Read a file from disk and extract its text.
pub fn extract_file(path: &Path) -> Result<String, ExtractionError> {
    let reader = reader_for_path(path)?;
    let bytes = std::fs::read(path)?;
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    extract_text(reader.as_ref(), &bytes, source)
}
