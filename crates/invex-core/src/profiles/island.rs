//! ISLAND profile: scanned invoices where each delivery order spans the
//! pages up to a SUB TOTAL page. Every range carries its own cell grid
//! of delivery rows; the range's aggregate view is overlaid on its
//! leading rows. Ranges whose header fields or grid cannot be read are
//! skipped, not fatal, and their pages land in the failure report.

use crate::acquire::grid::{self, PageTable};
use crate::acquire::ocr;
use crate::acquire::pdf;
use crate::aggregate::DescriptionAggregates;
use crate::annotate::AnnotationTable;
use crate::decode;
use crate::error::{AcquireError, Result};
use crate::extract::{dates, line_total, numbers};
use crate::model::LineItemEntry;
use crate::profiles::acs::file_name_of;
use crate::profiles::{
    delivery_ranges, fill_annotation_columns, majority, FileBlock, OcrStack, VendorPipeline,
};
use crate::table::{Cell, OutputTable};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{debug, warn};

pub const COLUMNS: &[&str] = &[
    "Inv No.",
    "Date",
    "Description",
    "Total Qty",
    "Unit",
    "Unit Rate",
    "Subtotal Amount",
    "Total Amt per Inv",
    "Invoice Num",
    "For Month (YYYY MM)",
    "Zone",
    "Site Person Name",
    "Site Person Contact",
    "Purchaser Representative",
    "Bored Pile No.: OR Location ***",
    "Building",
    "Subcons",
    "DO Date",
    "DO No.",
    "Description2",
    "Conc. Grade",
    "Conc. Slump",
    "Admix. 1",
    "Admix. 2",
    "Admix. 3",
    "Qty",
    "Unit2",
    "Vendor Invoice Unit Rate (S$)",
    "Vendor Invoice Amount",
];

/// Tokens that must all appear on the delivery-grid header row.
const GRID_TOKENS: &[&str] = &["DATE", "QTY"];

/// Grid width: date, DO number, description, qty+unit, rate, amount.
const GRID_WIDTH: usize = 6;

lazy_static! {
    static ref INVOICE_NO: Regex = Regex::new(r"\d{8,}").unwrap();
    static ref DO_DATE: Regex =
        Regex::new(r"DOCUMENT\s*DATE\s*(\d{2}/\d{2}/\d{2,4})").unwrap();
    static ref QTY_UNIT: Regex = Regex::new(r"(?P<qty>\d[\d,]*(?:\.\d+)?)\s*(?P<unit>.*)").unwrap();
}

/// Header fields recognized on one scanned page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSummary {
    pub invoice_number: Option<String>,
    pub do_date: Option<String>,
    pub subtotal: Option<Decimal>,
    pub building: Option<String>,
}

/// Scan one page's OCR lines for the invoice number, document date,
/// SUB TOTAL amount and project building.
pub fn scan_page(lines: &[String]) -> PageSummary {
    let mut summary = PageSummary::default();

    for line in lines {
        let upper = line.to_uppercase();

        if upper.contains("INVOICE NO") && summary.invoice_number.is_none() {
            if let Some(m) = INVOICE_NO.find(line) {
                summary.invoice_number = Some(m.as_str().to_string());
            }
        }

        if upper.contains("DOCUMENT DATE") && summary.do_date.is_none() {
            if let Some(caps) = DO_DATE.captures(&upper) {
                summary.do_date = Some(caps[1].to_string());
            }
        }

        if upper.contains("SUB TOTAL") && summary.subtotal.is_none() {
            if let Some(token) = line.split_whitespace().last() {
                summary.subtotal = numbers::parse_decimal("subtotal", token).ok();
            }
        }

        // PROJECT : BUILDING - SITE ...
        if upper.contains("PROJECT") && summary.building.is_none() {
            if let Some(head) = line.split('-').next() {
                if let Some(value) = head.split(':').nth(1) {
                    let value = value.trim();
                    if !value.is_empty() {
                        summary.building = Some(value.to_string());
                    }
                }
            }
        }
    }

    summary
}

/// Split a `9.0 m3` cell into quantity and lowercased unit.
pub fn split_qty_unit(cell: &str) -> Option<(Decimal, String)> {
    let caps = QTY_UNIT.captures(cell)?;
    let qty = numbers::parse_decimal("quantity", &caps["qty"]).ok()?;
    Some((qty, caps["unit"].trim().to_lowercase()))
}

/// Parse one grid row into a line item. Rows that do not carry a full
/// date/DO/description/qty/rate/amount cell set are scan noise.
pub fn parse_grid_row(cells: &[String]) -> Option<LineItemEntry> {
    if cells.len() != GRID_WIDTH {
        return None;
    }

    let date = dates::parse_dmy(&cells[0]).ok()?;
    let (quantity, _unit) = split_qty_unit(&cells[3])?;
    let unit_price = numbers::parse_decimal_lenient("unit rate", &cells[4]).ok()?;

    Some(LineItemEntry {
        for_month: dates::month_bucket(date),
        delivery_date: String::new(),
        do_number: cells[1].clone(),
        description: cells[2].clone(),
        quantity,
        unit_price,
        // Recomputed from rate and quantity; the printed amount cell is
        // the least reliable read on these scans
        amount: Some(line_total(quantity, unit_price)),
    })
}

/// Collect the delivery grid across one range's pages. Pages without a
/// grid header contribute nothing; a page whose grid width disagrees
/// with the range's first grid invalidates the whole range.
fn range_entries(pages: &[Vec<String>], first_page: u32) -> Result<Option<Vec<LineItemEntry>>> {
    let mut entries = Vec::new();
    let mut reference: Option<PageTable> = None;

    for (offset, lines) in pages.iter().enumerate() {
        let page_no = first_page + offset as u32;
        let table = match grid::detect_table(lines, page_no, GRID_TOKENS) {
            Ok(table) => table,
            Err(AcquireError::TableHeaderNotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        if let Some(reference) = &reference {
            if grid::check_columns(reference, &table).is_err() {
                warn!("column mismatch on page {}, range dropped", page_no);
                return Ok(None);
            }
        } else {
            reference = Some(table.clone());
        }

        for row in &table.rows {
            if let Some(entry) = parse_grid_row(row) {
                entries.push(entry);
            }
        }
    }

    if reference.is_none() || entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(entries))
}

/// One output row, fields in [`COLUMNS`] order; serialized to cells
/// only when pushed.
#[derive(Default)]
struct IslandRow {
    invoice_number: Cell,
    invoice_date: Cell,
    agg_description: Cell,
    agg_quantity: Cell,
    agg_unit: Cell,
    agg_unit_rate: Cell,
    agg_subtotal: Cell,
    total_amount: Cell,
    invoice_number_2: Cell,
    for_month: Cell,
    zone: Cell,
    contact_name: Cell,
    contact_number: Cell,
    representative: Cell,
    pile_location: Cell,
    building: Cell,
    subcon: Cell,
    do_date: Cell,
    do_number: Cell,
    description: Cell,
    grade: Cell,
    slump: Cell,
    admix_1: Cell,
    admix_2: Cell,
    admix_3: Cell,
    quantity: Cell,
    unit: Cell,
    unit_rate: Cell,
    amount: Cell,
}

impl IslandRow {
    fn into_cells(self) -> Vec<Cell> {
        vec![
            self.invoice_number,
            self.invoice_date,
            self.agg_description,
            self.agg_quantity,
            self.agg_unit,
            self.agg_unit_rate,
            self.agg_subtotal,
            self.total_amount,
            self.invoice_number_2,
            self.for_month,
            self.zone,
            self.contact_name,
            self.contact_number,
            self.representative,
            self.pile_location,
            self.building,
            self.subcon,
            self.do_date,
            self.do_number,
            self.description,
            self.grade,
            self.slump,
            self.admix_1,
            self.admix_2,
            self.admix_3,
            self.quantity,
            self.unit,
            self.unit_rate,
            self.amount,
        ]
    }
}

/// Assemble one document block from per-page OCR lines.
pub fn document_block(pages: &[Vec<String>]) -> Result<FileBlock> {
    let summaries: Vec<PageSummary> = pages.iter().map(|p| scan_page(p)).collect();
    let subtotal_pages: Vec<bool> = summaries.iter().map(|s| s.subtotal.is_some()).collect();
    let ranges = delivery_ranges(&subtotal_pages);
    debug!("{} pages, {} delivery orders", pages.len(), ranges.len());

    let mut table = OutputTable::new(COLUMNS.to_vec());
    let mut failed_pages = Vec::new();
    let mut first_range = true;

    for (start, end) in ranges {
        let in_range = &summaries[start..=end];
        let field = |get: fn(&PageSummary) -> Option<String>| {
            majority(&in_range.iter().map(get).collect::<Vec<_>>())
        };
        let invoice_number = field(|s| s.invoice_number.clone());
        let do_date = field(|s| s.do_date.clone());
        let building = field(|s| s.building.clone());

        let skip = |reason: &str, failed: &mut Vec<u32>| {
            warn!("pages {}-{}: {}, range dropped", start + 1, end + 1, reason);
            failed.extend((start as u32 + 1)..=(end as u32 + 1));
        };

        let (Some(invoice_number), Some(do_date_raw)) = (invoice_number, do_date) else {
            skip("invoice number or document date unreadable", &mut failed_pages);
            continue;
        };
        let Ok(parsed_date) = dates::parse_dmy(&do_date_raw) else {
            skip("document date unparseable", &mut failed_pages);
            continue;
        };
        let Some(entries) = range_entries(&pages[start..=end], start as u32 + 1)? else {
            skip("no delivery grid recognized", &mut failed_pages);
            continue;
        };

        let display_date = dates::short_date(parsed_date);
        let aggregates = DescriptionAggregates::from_entries(&entries);

        if !first_range {
            table.push_row(vec![Cell::Empty; COLUMNS.len()]);
        }
        first_range = false;

        for (i, entry) in entries.iter().enumerate() {
            let code = decode::decode_island(&entry.description)?;

            let mut row = IslandRow::default();
            if i == 0 {
                row.invoice_number = Cell::text(invoice_number.clone());
                row.invoice_date = Cell::text(display_date.clone());
                row.total_amount = Cell::Number(aggregates.computed_total());
            }
            if let Some(agg) = aggregates.get(i) {
                row.agg_description = Cell::text(agg.description.clone());
                row.agg_quantity = Cell::Number(agg.total_quantity);
                row.agg_unit = Cell::text(agg.unit);
                row.agg_unit_rate = Cell::Number(agg.unit_price);
                row.agg_subtotal = Cell::Number(agg.subtotal());
            }
            row.invoice_number_2 = Cell::text(invoice_number.clone());
            row.for_month = Cell::text(entry.for_month.clone());
            row.building = Cell::opt_text(building.clone());
            row.do_date = Cell::text(display_date.clone());
            row.do_number = Cell::text(entry.do_number.clone());
            row.description = Cell::text(entry.description.clone());
            row.grade = Cell::opt_text(code.grade);
            row.slump = Cell::opt_text(code.slump);
            row.admix_1 = Cell::opt_text(code.retardant);
            row.admix_2 = Cell::opt_text(code.duration);
            row.quantity = Cell::Number(entry.quantity);
            row.unit = Cell::text(decode::unit_for(&entry.description));
            row.unit_rate = Cell::Number(entry.unit_price);
            row.amount = Cell::opt_number(entry.amount);
            table.push_row(row.into_cells());
        }
    }

    let mut block = FileBlock::new(table);
    block.failed_pages = failed_pages;
    Ok(block)
}

pub struct IslandPipeline {
    stack: OcrStack,
    dpi: u32,
}

impl IslandPipeline {
    pub fn new(stack: OcrStack, dpi: u32) -> Self {
        Self { stack, dpi }
    }
}

impl VendorPipeline for IslandPipeline {
    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn process_file(&self, path: &Path) -> Result<FileBlock> {
        let count = pdf::page_count(path)?;
        let mut pages = Vec::with_capacity(count as usize);
        for page in 1..=count {
            pages.push(ocr::ocr_page_lines(
                self.stack.renderer.as_ref(),
                self.stack.engine.as_ref(),
                path,
                page,
                self.dpi,
            )?);
        }
        debug!("{}: {} pages rendered", file_name_of(path), count);
        document_block(&pages)
    }

    fn load_annotations(&self, sheet: &Path) -> Result<AnnotationTable> {
        Ok(AnnotationTable::from_island_sheet(sheet)?)
    }

    fn apply_annotations(&self, table: &mut OutputTable, annotations: &AnnotationTable) {
        fill_annotation_columns(
            table,
            annotations,
            "DO No.",
            &[
                ("Zone", |r| r.zone.as_ref()),
                ("Site Person Name", |r| r.contact_name.as_ref()),
                ("Site Person Contact", |r| r.contact_number.as_ref()),
                ("Purchaser Representative", |r| r.signee.as_ref()),
                ("Bored Pile No.: OR Location ***", |r| r.location.as_ref()),
                ("Subcons", |r| r.subcon.as_ref()),
            ],
        );
    }
}
