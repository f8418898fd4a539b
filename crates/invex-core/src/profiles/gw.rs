//! GW profile: fully scanned invoices rendered at high DPI. Each
//! delivery order spans one or more pages and ends on the page that
//! prints a BEFORE TAX subtotal; header fields misread on individual
//! pages are repaired by majority vote within the delivery-order range.

use crate::acquire::ocr;
use crate::acquire::pdf;
use crate::error::Result;
use crate::extract::{dates, numbers};
use crate::profiles::acs::file_name_of;
use crate::profiles::{delivery_ranges, majority, FileBlock, OcrStack, VendorPipeline};
use crate::table::{Cell, OutputTable};
use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::debug;

pub const COLUMNS: &[&str] = &[
    "Inv No.",
    "Date",
    "Description",
    "TOTAL QTY",
    "Unit",
    "Unit Rate",
    "Subtotal Amt",
    "TOTAL AMT per INV",
    "Inv Number",
    "For Month (YYYY MM)",
    "Zone/ Bldg",
    "Pile No./Location",
    "For TAK or Subcon?\n[Pintary/ BBR/ KKL..etc]",
    "DO Date",
    "DO No.",
    "Description2",
    "Code1",
    "Code2",
    "Code3",
    "Code4",
    "Qty",
    "Vendor Invoice Rate",
    "Vendor Invoice Subtotal",
];

lazy_static! {
    static ref INVOICE_NO: Regex = Regex::new(r"\d{8,10}").unwrap();
    static ref DO_DATE: Regex = Regex::new(r"DATE\s*(\d{2}[./]\d{2}[./]\d{2,4})").unwrap();
    static ref SUBTOTAL: Regex = Regex::new(r"\d{1,3}(?:,\d{3})*(?:\.\d{2})?").unwrap();
    static ref ROW_DATE: Regex = Regex::new(r"\d{2}[./]\d{2}[./]\d{4}").unwrap();
}

/// Header fields recognized on one scanned page. Any of them may be
/// missing when the scan is noisy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSummary {
    pub invoice_number: Option<String>,
    pub do_date: Option<String>,
    pub subtotal: Option<Decimal>,
}

/// One delivery row below the QTY/UNIT table header.
#[derive(Debug, Clone, PartialEq)]
pub struct GwRow {
    pub for_month: String,
    pub do_date: String,
    pub do_number: Option<String>,
}

/// Scan one page's OCR lines for the reference number, document date
/// and BEFORE TAX subtotal.
pub fn scan_page(lines: &[String]) -> PageSummary {
    let mut summary = PageSummary::default();

    for line in lines {
        let upper = line.to_uppercase();

        if upper.contains("REFERENCE NO") && summary.invoice_number.is_none() {
            if let Some(m) = INVOICE_NO.find(line) {
                summary.invoice_number = Some(m.as_str().to_string());
            }
        }

        if upper.contains("DATE") && summary.do_date.is_none() {
            if let Some(caps) = DO_DATE.captures(&upper) {
                summary.do_date = Some(caps[1].to_string());
            }
        }

        if upper.contains("BEFORE TAX") && summary.subtotal.is_none() {
            if let Some(m) = SUBTOTAL.find(line) {
                summary.subtotal = numbers::parse_decimal("subtotal", m.as_str()).ok();
            }
        }
    }

    summary
}

/// Pull delivery rows off one page: everything below the QTY/UNIT table
/// header that carries a full date. The DO number is the second token
/// on the row.
pub fn table_rows(lines: &[String]) -> Result<Vec<GwRow>> {
    let mut rows = Vec::new();
    let mut table_reached = false;

    for line in lines {
        let upper = line.to_uppercase();
        if upper.contains("QTY") && upper.contains("UNIT") {
            table_reached = true;
            continue;
        }
        if !table_reached {
            continue;
        }

        let Some(m) = ROW_DATE.find(line) else {
            continue;
        };
        let date = dates::parse_dmy(m.as_str())?;
        let do_number = line.split_whitespace().nth(1).map(str::to_string);

        rows.push(GwRow {
            for_month: dates::month_bucket(date),
            // Day-first without zero padding, as the target sheet wants
            do_date: format!("{}/{}/{}", date.day(), date.month(), date.year()),
            do_number,
        });
    }

    Ok(rows)
}

/// One output row, fields in [`COLUMNS`] order; serialized to cells
/// only when pushed.
#[derive(Default)]
struct GwOutputRow {
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
    zone_building: Cell,
    pile_location: Cell,
    ordered_by: Cell,
    do_date: Cell,
    do_number: Cell,
    description: Cell,
    code1: Cell,
    code2: Cell,
    code3: Cell,
    code4: Cell,
    quantity: Cell,
    unit_rate: Cell,
    subtotal: Cell,
}

impl GwOutputRow {
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
            self.zone_building,
            self.pile_location,
            self.ordered_by,
            self.do_date,
            self.do_number,
            self.description,
            self.code1,
            self.code2,
            self.code3,
            self.code4,
            self.quantity,
            self.unit_rate,
            self.subtotal,
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
    for (start, end) in ranges {
        let in_range = &summaries[start..=end];
        let invoice_number = majority(
            &in_range
                .iter()
                .map(|s| s.invoice_number.clone())
                .collect::<Vec<_>>(),
        );
        let do_date = majority(
            &in_range
                .iter()
                .map(|s| s.do_date.clone())
                .collect::<Vec<_>>(),
        );
        let subtotal = summaries[end].subtotal;

        let mut first_in_range = true;
        for page in &pages[start..=end] {
            for row in table_rows(page)? {
                let mut out = GwOutputRow::default();
                if first_in_range {
                    out.invoice_number = Cell::opt_text(invoice_number.clone());
                    out.invoice_date = Cell::opt_text(do_date.clone());
                    out.total_amount = Cell::opt_number(subtotal);
                    first_in_range = false;
                }
                out.for_month = Cell::text(row.for_month);
                out.do_date = Cell::text(row.do_date);
                out.do_number = Cell::opt_text(row.do_number);
                table.push_row(out.into_cells());
            }
        }
    }

    Ok(FileBlock::new(table))
}

pub struct GwPipeline {
    stack: OcrStack,
    dpi: u32,
}

impl GwPipeline {
    pub fn new(stack: OcrStack, dpi: u32) -> Self {
        Self { stack, dpi }
    }
}

impl VendorPipeline for GwPipeline {
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
}
