//! BRC profile: mesh invoices with a printed item grid on the text
//! layer and a stamped final page that only OCR can read. Item pages
//! accumulate until the grid header disappears; that page carries the
//! delivery stamp with the required date and job location.

use crate::acquire::grid::{self, PageTable};
use crate::acquire::ocr;
use crate::acquire::pdf;
use crate::error::{AcquireError, ExtractError, Result};
use crate::extract::{dates, numbers, HeaderSlot};
use crate::profiles::acs::file_name_of;
use crate::profiles::{FileBlock, OcrStack, VendorPipeline};
use crate::table::{Cell, OutputTable};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::debug;

pub const COLUMNS: &[&str] = &[
    "INVOICE NO. 1",
    "INVOICE DATE",
    "TOTAL AMT",
    "INVOICE NO. 2",
    "FOR MONTH (YYYY MM)",
    "ZONE",
    "LOCATION",
    "SUBCON",
    "DATE REQ.",
    "ORDER REF.",
    "DO/NO",
    "DESCRIPTION",
    "CODE 1",
    "CODE 2",
    "QTY",
    "PDF SUBTOTAL",
];

/// Tokens that must all appear on the item-grid header row.
const GRID_TOKENS: &[&str] = &["DO/NO", "QTY"];

lazy_static! {
    static ref DO_NUMBER: Regex = Regex::new(r"^\d{8}$").unwrap();
    static ref ITEM_INDEX: Regex = Regex::new(r"^\d{1,3}$").unwrap();
    static ref PART_OF_JOB: Regex = Regex::new(r"PART OF JOB\s*:?\s*(.*)").unwrap();
    static ref DATE_REQUIRED: Regex = Regex::new(r"\d{1,2}/\d{1,2}/\d{2,4}").unwrap();
}

/// One mesh item row recovered from the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BrcItem {
    pub do_number: String,
    pub description: String,
    pub quantity: Decimal,
    pub subtotal: Decimal,
}

/// Header fields scraped from the invoice text layer.
#[derive(Debug, Default)]
pub struct BrcHeader {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<String>,
    pub order_ref: Option<String>,
    pub subcon: Option<String>,
    pub zone: Option<String>,
}

/// Fields read off the delivery stamp (OCR page).
#[derive(Debug, Default, PartialEq)]
pub struct StampFields {
    pub date_required: Option<String>,
    pub location: Option<String>,
}

/// Parse one grid row into an item. Rows come in three shapes: a full
/// row with an item index and DO number, a continuation row for the
/// same DO (forward-filled), and non-item noise (totals, captions)
/// which yields `None`.
pub fn parse_item_row(cells: &[String], last_do: &mut Option<String>) -> Option<BrcItem> {
    if cells.len() < 3 {
        return None;
    }

    let mut idx = 0;
    // Leading item index, when present
    if ITEM_INDEX.is_match(&cells[idx]) {
        idx += 1;
    }

    let do_number = if idx < cells.len() && DO_NUMBER.is_match(&cells[idx]) {
        let d = cells[idx].clone();
        idx += 1;
        *last_do = Some(d.clone());
        d
    } else {
        last_do.clone()?
    };

    let description = cells.get(idx)?.clone();
    if !description.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if description.to_uppercase().contains("TOTAL") {
        return None;
    }
    idx += 1;

    // Quantity is the first numeric cell after the description; the
    // printed subtotal is the last cell on the row.
    let quantity = cells[idx..]
        .iter()
        .find_map(|c| numbers::parse_decimal("quantity", c).ok())?;
    let subtotal = numbers::parse_decimal("subtotal", cells.last()?).ok()?;

    Some(BrcItem {
        do_number,
        description,
        quantity: quantity.round_dp(6),
        subtotal,
    })
}

/// Collect item rows across grid pages. Returns the items and the
/// 1-based page number where the grid ended (the stamp page).
pub fn collect_items(pages: &[Vec<String>]) -> Result<(Vec<BrcItem>, u32)> {
    let mut items = Vec::new();
    let mut last_do: Option<String> = None;
    let mut reference: Option<PageTable> = None;
    let mut stamp_page = pages.len() as u32;

    for (i, lines) in pages.iter().enumerate() {
        let page_no = (i + 1) as u32;
        let table = match grid::detect_table(lines, page_no, GRID_TOKENS) {
            Ok(table) => table,
            Err(AcquireError::TableHeaderNotFound(_)) => {
                stamp_page = page_no;
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(reference) = &reference {
            grid::check_columns(reference, &table)?;
        } else {
            reference = Some(table.clone());
        }

        for row in &table.rows {
            if let Some(item) = parse_item_row(row, &mut last_do) {
                items.push(item);
            }
        }
    }

    if items.is_empty() {
        return Err(ExtractError::NoLineItems.into());
    }
    Ok((items, stamp_page))
}

/// Scrape invoice-level fields from the text layer. The order reference
/// decides subcon and zone; a reference naming neither known subcon is
/// fatal for the file.
pub fn parse_header_lines(lines: &[String]) -> Result<BrcHeader> {
    let mut invoice_number = HeaderSlot::default();
    let mut invoice_date = HeaderSlot::default();
    let mut header = BrcHeader::default();

    for line in lines {
        let upper = line.to_uppercase();

        if upper.contains("INVOICE NO") && !invoice_number.is_filled() {
            if let Some(value) = line.split(':').next_back() {
                invoice_number.fill(value.trim().to_string());
            }
        }

        if upper.contains("DATE") && !upper.contains("DUE") && !invoice_date.is_filled() {
            if let Some(value) = line.split(':').next_back() {
                invoice_date.fill(value.trim().to_string());
            }
        }

        if upper.contains("CUSTOMER ORDER REF") && header.order_ref.is_none() {
            let after = line.split(':').nth(1).unwrap_or_default();
            let order_ref = after
                .trim()
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();

            let (subcon, zone) = if order_ref.to_uppercase().contains("CSBP") {
                ("CSBP", "A")
            } else if order_ref.to_uppercase().contains("BBR") {
                ("BBR", "B")
            } else {
                return Err(ExtractError::UnknownOrderRef(order_ref).into());
            };

            header.order_ref = Some(order_ref);
            header.subcon = Some(subcon.to_string());
            header.zone = Some(zone.to_string());
        }
    }

    header.invoice_number = invoice_number.take();
    header.invoice_date = invoice_date.take();
    Ok(header)
}

/// Pull the required date and job location off the OCRed stamp lines.
/// The date is the first slash-separated d/m/y token on its line.
pub fn parse_stamp_lines(lines: &[String]) -> StampFields {
    let mut fields = StampFields::default();

    for line in lines {
        let upper = line.to_uppercase();

        if fields.date_required.is_none() && upper.contains("DATE REQUIRED") {
            if let Some(m) = DATE_REQUIRED.find(line) {
                fields.date_required = Some(m.as_str().to_string());
            }
        }

        if fields.location.is_none() {
            if let Some(caps) = PART_OF_JOB.captures(&upper) {
                let loc = caps[1].trim().to_string();
                if !loc.is_empty() {
                    fields.location = Some(loc);
                }
            }
        }

        if fields.date_required.is_some() && fields.location.is_some() {
            break;
        }
    }

    fields
}

/// One output row, fields in [`COLUMNS`] order; serialized to cells
/// only when pushed.
#[derive(Default)]
struct BrcRow {
    invoice_number: Cell,
    invoice_date: Cell,
    total_amount: Cell,
    invoice_number_2: Cell,
    for_month: Cell,
    zone: Cell,
    location: Cell,
    subcon: Cell,
    date_required: Cell,
    order_ref: Cell,
    do_number: Cell,
    description: Cell,
    code1: Cell,
    code2: Cell,
    quantity: Cell,
    subtotal: Cell,
}

impl BrcRow {
    fn into_cells(self) -> Vec<Cell> {
        vec![
            self.invoice_number,
            self.invoice_date,
            self.total_amount,
            self.invoice_number_2,
            self.for_month,
            self.zone,
            self.location,
            self.subcon,
            self.date_required,
            self.order_ref,
            self.do_number,
            self.description,
            self.code1,
            self.code2,
            self.quantity,
            self.subtotal,
        ]
    }
}

/// Assemble one document block in the BRC schema.
pub fn document_block(
    header: &BrcHeader,
    stamp: &StampFields,
    items: &[BrcItem],
) -> Result<FileBlock> {
    let for_month = match &header.invoice_date {
        Some(raw) => dates::month_bucket(dates::parse_dmy(raw)?),
        None => String::new(),
    };
    let total: Decimal = items.iter().map(|i| i.subtotal).sum();

    let mut table = OutputTable::new(COLUMNS.to_vec());
    for (i, item) in items.iter().enumerate() {
        let mut row = BrcRow::default();
        if i == 0 {
            row.invoice_number = Cell::opt_text(header.invoice_number.clone());
            row.invoice_date = Cell::opt_text(header.invoice_date.clone());
            row.total_amount = Cell::Number(total);
        }
        row.invoice_number_2 = Cell::opt_text(header.invoice_number.clone());
        row.for_month = Cell::text(for_month.clone());
        row.zone = Cell::opt_text(header.zone.clone());
        row.location = Cell::opt_text(stamp.location.clone());
        row.subcon = Cell::opt_text(header.subcon.clone());
        row.date_required = Cell::opt_text(stamp.date_required.clone());
        row.order_ref = Cell::opt_text(header.order_ref.clone());
        row.do_number = Cell::text(item.do_number.clone());
        row.description = Cell::text(item.description.clone());
        row.quantity = Cell::Number(item.quantity);
        row.subtotal = Cell::Number(item.subtotal);
        table.push_row(row.into_cells());
    }

    Ok(FileBlock::new(table))
}

pub struct BrcPipeline {
    stack: OcrStack,
    dpi: u32,
}

impl BrcPipeline {
    pub fn new(stack: OcrStack, dpi: u32) -> Self {
        Self { stack, dpi }
    }
}

impl VendorPipeline for BrcPipeline {
    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn process_file(&self, path: &Path) -> Result<FileBlock> {
        let text = pdf::extract_page_lines(path)?;
        let (items, stamp_page) = collect_items(&text.pages)?;
        debug!(
            "{}: {} items, stamp on page {}",
            file_name_of(path),
            items.len(),
            stamp_page
        );

        let header_lines: Vec<String> = text.lines().map(str::to_string).collect();
        let header = parse_header_lines(&header_lines)?;

        let stamp_lines = ocr::ocr_page_lines(
            self.stack.renderer.as_ref(),
            self.stack.engine.as_ref(),
            path,
            stamp_page,
            self.dpi,
        )?;
        let stamp = parse_stamp_lines(&stamp_lines);

        document_block(&header, &stamp, &items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn cells(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_item_row_full() {
        let mut last_do = None;
        let item = parse_item_row(
            &cells(&["1", "12345678", "MESH A10", "2.0", "pc", "75.00", "100", "150.00"]),
            &mut last_do,
        )
        .unwrap();
        assert_eq!(item.do_number, "12345678");
        assert_eq!(item.description, "MESH A10");
        assert_eq!(item.quantity, dec!(2.0));
        assert_eq!(item.subtotal, dec!(150.00));
        assert_eq!(last_do.as_deref(), Some("12345678"));
    }

    #[test]
    fn test_parse_item_row_forward_fills_do() {
        let mut last_do = Some("12345678".to_string());
        let item = parse_item_row(
            &cells(&["2", "MESH B7", "1.0", "pc", "60.00", "100", "60.00"]),
            &mut last_do,
        )
        .unwrap();
        assert_eq!(item.do_number, "12345678");
        assert_eq!(item.description, "MESH B7");
    }

    #[test]
    fn test_parse_item_row_skips_totals() {
        let mut last_do = Some("12345678".to_string());
        assert_eq!(
            parse_item_row(&cells(&["TOTAL SGD", "210.00", "210.00"]), &mut last_do),
            None
        );
    }

    #[test]
    fn test_collect_items_across_pages() {
        let pages = vec![
            vec![
                "IT  DO/NO  DESCRIPTION  QTY  UNIT  UNIT PRICE  PER  $ AMOUNT".to_string(),
                "1  12345678  MESH A10  2.0  pc  75.00  100  150.00".to_string(),
            ],
            vec![
                "IT  DO/NO  DESCRIPTION  QTY  UNIT  UNIT PRICE  PER  $ AMOUNT".to_string(),
                "2  MESH B7  1.0  pc  60.00  100  60.00".to_string(),
            ],
            vec!["DELIVERY STAMP".to_string()],
        ];
        let (items, stamp_page) = collect_items(&pages).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].do_number, "12345678");
        assert_eq!(stamp_page, 3);
    }

    #[test]
    fn test_header_order_ref_decides_subcon_and_zone() {
        let header = parse_header_lines(&[
            "INVOICE NO : 445566".to_string(),
            "DATE : 15/02/2024".to_string(),
            "CUSTOMER ORDER REF : CSBP-100 extra".to_string(),
        ])
        .unwrap();
        assert_eq!(header.invoice_number.as_deref(), Some("445566"));
        assert_eq!(header.order_ref.as_deref(), Some("CSBP-100"));
        assert_eq!(header.subcon.as_deref(), Some("CSBP"));
        assert_eq!(header.zone.as_deref(), Some("A"));
    }

    #[test]
    fn test_header_unknown_order_ref_is_fatal() {
        let err = parse_header_lines(&["CUSTOMER ORDER REF : XYZ-1".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::InvexError::Extract(ExtractError::UnknownOrderRef(_))
        ));
    }

    #[test]
    fn test_stamp_fields() {
        let stamp = parse_stamp_lines(&[
            "DATE REQUIRED 15/02/2024 morning".to_string(),
            "PART OF JOB : BASEMENT 2".to_string(),
        ]);
        assert_eq!(stamp.date_required.as_deref(), Some("15/02/2024"));
        assert_eq!(stamp.location.as_deref(), Some("BASEMENT 2"));
    }

    #[test]
    fn test_stamp_date_survives_multibyte_ocr_noise() {
        // tesseract output can carry stray accented glyphs next to digits
        let stamp = parse_stamp_lines(&["DATE REQUIRED é5/02/2024".to_string()]);
        assert_eq!(stamp.date_required.as_deref(), Some("5/02/2024"));
    }

    #[test]
    fn test_document_block_first_row_totals() {
        let header = parse_header_lines(&[
            "INVOICE NO : 445566".to_string(),
            "DATE : 15/02/2024".to_string(),
            "CUSTOMER ORDER REF : BBR-7".to_string(),
        ])
        .unwrap();
        let items = vec![
            BrcItem {
                do_number: "12345678".to_string(),
                description: "MESH A10".to_string(),
                quantity: dec!(2.0),
                subtotal: dec!(150.00),
            },
            BrcItem {
                do_number: "12345678".to_string(),
                description: "MESH B7".to_string(),
                quantity: dec!(1.0),
                subtotal: dec!(60.00),
            },
        ];
        let block = document_block(&header, &StampFields::default(), &items).unwrap();
        assert_eq!(block.table.len(), 2);

        let total_idx = block.table.column_index("TOTAL AMT").unwrap();
        assert_eq!(block.table.rows[0][total_idx], Cell::Number(dec!(210.00)));
        assert_eq!(block.table.rows[1][total_idx], Cell::Empty);

        let month_idx = block
            .table
            .column_index("FOR MONTH (YYYY MM)")
            .unwrap();
        assert_eq!(block.table.rows[1][month_idx], Cell::text("2024 02"));

        let zone_idx = block.table.column_index("ZONE").unwrap();
        assert_eq!(block.table.rows[0][zone_idx], Cell::text("B"));
    }
}
