//! Whitespace-grid table detection over acquired page lines.
//!
//! Ruled-table PDFs (BRC, ISLAND) print their cells separated by runs
//! of spaces. Splitting each line on 2+ spaces recovers a cell grid;
//! the header row is located by its required column tokens and must be
//! present, otherwise the column mapping cannot be trusted.

use crate::error::AcquireError;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref CELL_GUTTER: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// A detected table on one page.
#[derive(Debug, Clone)]
pub struct PageTable {
    /// Header cells, as printed.
    pub headers: Vec<String>,
    /// Data rows below the header. Short rows are kept as-is; the
    /// caller decides whether a width mismatch is fatal.
    pub rows: Vec<Vec<String>>,
}

impl PageTable {
    /// Index of a column whose header contains `token`
    /// (case-insensitive).
    pub fn column(&self, token: &str) -> Option<usize> {
        let token = token.to_uppercase();
        self.headers
            .iter()
            .position(|h| h.to_uppercase().contains(&token))
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }
}

/// Split one line into cells on whitespace gutters.
pub fn split_cells(line: &str) -> Vec<String> {
    CELL_GUTTER
        .split(line.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect()
}

/// Detect the table on a page: find the header row containing every
/// required token, then collect the rows below it. A page without a
/// recognizable header is a fatal acquisition error.
pub fn detect_table(
    lines: &[String],
    page: u32,
    required_tokens: &[&str],
) -> Result<PageTable, AcquireError> {
    let header_idx = lines
        .iter()
        .position(|line| {
            let upper = line.to_uppercase();
            required_tokens.iter().all(|t| upper.contains(&t.to_uppercase()))
        })
        .ok_or(AcquireError::TableHeaderNotFound(page))?;

    let headers = split_cells(&lines[header_idx]);
    let rows = lines[header_idx + 1..]
        .iter()
        .map(|line| split_cells(line))
        .filter(|cells| !cells.is_empty())
        .collect::<Vec<_>>();

    debug!(
        "page {}: table with {} columns, {} rows",
        page,
        headers.len(),
        rows.len()
    );

    Ok(PageTable { headers, rows })
}

/// Verify a continuation page's table lines up with the first page's
/// column set.
pub fn check_columns(reference: &PageTable, table: &PageTable) -> Result<(), AcquireError> {
    if reference.width() != table.width() {
        return Err(AcquireError::ColumnMismatch {
            expected: reference.width(),
            found: table.width(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_cells_on_gutters() {
        assert_eq!(
            split_cells("12345678  READY MIX G30  9.0 m3  101.00"),
            vec!["12345678", "READY MIX G30", "9.0 m3", "101.00"]
        );
    }

    #[test]
    fn test_detect_table_finds_header() {
        let page = lines(&[
            "SOME TITLE",
            "DO/NO  DESCRIPTION  QTY  UNIT  $ AMOUNT",
            "12345678  MESH A10  2.0  pc  150.00",
            "",
            "12345679  MESH A10  1.0  pc  75.00",
        ]);
        let table = detect_table(&page, 1, &["DO/NO", "QTY"]).unwrap();
        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column("description"), Some(1));
    }

    #[test]
    fn test_detect_table_missing_header_is_fatal() {
        let page = lines(&["just some text", "no table here"]);
        let err = detect_table(&page, 3, &["DO/NO", "QTY"]).unwrap_err();
        assert!(matches!(err, AcquireError::TableHeaderNotFound(3)));
    }

    #[test]
    fn test_check_columns_mismatch() {
        let a = PageTable {
            headers: vec!["A".into(), "B".into()],
            rows: vec![],
        };
        let b = PageTable {
            headers: vec!["A".into()],
            rows: vec![],
        };
        assert!(check_columns(&a, &b).is_err());
        assert!(check_columns(&a, &a.clone()).is_ok());
    }
}
