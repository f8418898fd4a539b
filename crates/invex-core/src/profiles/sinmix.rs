//! SINMIX profile: delivery-order scans of wildly varying quality. Each
//! page is rendered once and recognized under an escalating contrast
//! sweep until a DO number shows up on a `DO NO` line; pages that never
//! yield one are recorded as per-page failures.

use crate::acquire::raster::{binarize, enhance_contrast};
use crate::acquire::pdf;
use crate::error::Result;
use crate::profiles::acs::file_name_of;
use crate::profiles::{FileBlock, OcrStack, VendorPipeline};
use crate::table::{Cell, OutputTable};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use tracing::debug;

pub const COLUMNS: &[&str] = &["File", "Page", "DO No."];

lazy_static! {
    static ref DO_NUMBER: Regex = Regex::new(r"\b\d{8}\b").unwrap();
}

/// Find the DO number in recognized page text: an 8-digit run on a line
/// whose label reads `DO NO` once OCR artifacts (dots, spacing) are
/// squashed out.
pub fn find_do_number(text: &str) -> Option<String> {
    for line in text.lines() {
        let squashed: String = line
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if !squashed.contains("DONO") {
            continue;
        }
        if let Some(m) = DO_NUMBER.find(line) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

pub struct SinmixPipeline {
    stack: OcrStack,
    dpi: u32,
    max_contrast: u32,
}

impl SinmixPipeline {
    pub fn new(stack: OcrStack, dpi: u32, max_contrast: u32) -> Self {
        Self {
            stack,
            dpi,
            max_contrast,
        }
    }

    /// Sweep contrast levels over an already-rendered page until the DO
    /// number becomes readable.
    fn recognize_do(&self, path: &Path, page: u32) -> Result<Option<String>> {
        let rendered = self.stack.renderer.as_ref().render(path, page, self.dpi)?;

        for contrast in 1..=self.max_contrast.max(1) {
            let enhanced = enhance_contrast(&rendered, contrast);
            let text = self.stack.engine.recognize(&binarize(&enhanced))?;
            if let Some(do_number) = find_do_number(&text) {
                debug!("page {}: DO {} at contrast {}", page, do_number, contrast);
                return Ok(Some(do_number));
            }
        }
        Ok(None)
    }
}

impl VendorPipeline for SinmixPipeline {
    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn process_file(&self, path: &Path) -> Result<FileBlock> {
        let file_name = file_name_of(path);
        let count = pdf::page_count(path)?;

        let mut table = OutputTable::new(COLUMNS.to_vec());
        let mut failed_pages = Vec::new();

        for page in 1..=count {
            match self.recognize_do(path, page)? {
                Some(do_number) => {
                    table.push_row(vec![
                        Cell::text(file_name.clone()),
                        Cell::Int(page as i64),
                        Cell::text(do_number),
                    ]);
                }
                None => failed_pages.push(page),
            }
        }

        let mut block = FileBlock::new(table);
        block.failed_pages = failed_pages;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_find_do_number_on_do_no_line() {
        let text = "SINMIX PTE LTD\nD.O. NO : 55667788\nGRADE C25";
        assert_eq!(find_do_number(text).as_deref(), Some("55667788"));
    }

    #[test]
    fn test_find_do_number_ignores_other_lines() {
        // 8-digit run on a non-DO line must not match
        let text = "INVOICE 55667788\nGRADE C25";
        assert_eq!(find_do_number(text), None);
    }

    #[test]
    fn test_find_do_number_needs_eight_digits() {
        assert_eq!(find_do_number("DO NO : 1234567"), None);
        assert_eq!(find_do_number("DO NO : 123456789"), None);
    }
}
