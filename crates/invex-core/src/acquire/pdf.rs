//! Native PDF text extraction using lopdf and pdf-extract.

use crate::error::AcquireError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Text content of one PDF, split into per-page line lists.
#[derive(Debug, Clone)]
pub struct PdfText {
    /// Lines per page, page order preserved.
    pub pages: Vec<Vec<String>>,
}

impl PdfText {
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// All lines of the document in reading order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flatten().map(String::as_str)
    }
}

/// Number of pages in a PDF, validating that it is parseable and not
/// encrypted with a real password.
pub fn page_count(path: &Path) -> Result<u32, AcquireError> {
    let doc = load_document(path)?;
    let count = doc.get_pages().len() as u32;
    if count == 0 {
        return Err(AcquireError::NoPages);
    }
    Ok(count)
}

/// Extract the embedded text layer, split into per-page line lists.
///
/// pdf-extract yields one text stream for the whole document; lines are
/// apportioned evenly across the page count. Line-oriented extractors
/// only care about line adjacency, so an off-by-a-few page boundary is
/// harmless.
pub fn extract_page_lines(path: &Path) -> Result<PdfText, AcquireError> {
    let count = page_count(path)? as usize;

    let text = pdf_extract::extract_text(path)
        .map_err(|e| AcquireError::TextExtraction(e.to_string()))?;
    let lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();

    debug!("extracted {} text lines across {} pages", lines.len(), count);

    let per_page = lines.len().div_ceil(count).max(1);
    let pages = lines
        .chunks(per_page)
        .map(|chunk| chunk.to_vec())
        .collect::<Vec<_>>();

    Ok(PdfText { pages })
}

fn load_document(path: &Path) -> Result<Document, AcquireError> {
    let mut doc = Document::load(path).map_err(|e| AcquireError::Parse(e.to_string()))?;

    // Empty-password encryption is common on vendor exports
    if doc.is_encrypted() && doc.decrypt("").is_err() {
        return Err(AcquireError::Encrypted);
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_count_missing_file() {
        let err = page_count(Path::new("/nonexistent/invoice.pdf")).unwrap_err();
        assert!(matches!(err, AcquireError::Parse(_)));
    }

    #[test]
    fn test_pdf_text_lines_flatten_in_order() {
        let text = PdfText {
            pages: vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()],
            ],
        };
        assert_eq!(text.page_count(), 2);
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
