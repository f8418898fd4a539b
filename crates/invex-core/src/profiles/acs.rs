//! ACS profile: native-text invoices with a `CU`-unit line grammar,
//! literal UNDERLOAD CHARGES lines, and an optional summary spreadsheet
//! keyed by ticket number.

use crate::acquire::pdf;
use crate::aggregate::DescriptionAggregates;
use crate::annotate::AnnotationTable;
use crate::decode;
use crate::error::Result;
use crate::extract::{dates, numbers, HeaderSlot, LineGrammar};
use crate::model::{HeaderFields, InvoiceDocument, LineItemEntry};
use crate::extract::underload::surcharge_entry_with_rate;
use crate::profiles::{fill_annotation_columns, FileBlock, VendorPipeline};
use crate::table::{Cell, OutputTable};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::debug;

pub const COLUMNS: &[&str] = &[
    "Inv No.",
    "Date",
    "Description",
    "Total Qty",
    "Unit",
    "Unit Rate",
    "Subtotal Amount",
    "Total Amt per Inv",
    "For Month (YYYY MM)",
    "Zone",
    "Purchaser Personnel Name",
    "Purchaser Personnel Contact",
    "Bored Pile No.: OR Location ***",
    "Size",
    "Ordered by TAK or Subcon? [Pintary/ BBR/ KKL..etc]",
    "DO Date",
    "DO No.",
    "Description2",
    "Code1",
    "Code2",
    "Code3",
    "Code4",
    "Qty",
    "Vendor Invoice Amount",
];

lazy_static! {
    static ref INVOICE_NO: Regex = Regex::new(r"(?i)INVOICE\s*NO.*?(\d{6})\s*$").unwrap();
    static ref INVOICE_DATE: Regex =
        Regex::new(r"(?i)DATE\s*:.*?(\d{2}/\d{2}/\d{4})\s*$").unwrap();

    // Project @ LOCATION - SUBCON Contract No : nnnn
    static ref LOC_SUBCON: Regex = Regex::new(
        r"[A-Za-z]+\s*@\s*(?P<location>[A-Z\s\.]+)-\s*(?P<subcon>[A-Z\s]+)Contract\s*No\s*:"
    )
    .unwrap();

    static ref LINE: Regex = Regex::new(
        r"^\s*(?P<date>\d{2}/\d{2}/\d{4})\s*(?P<do_no>[A-Za-z]{2}\s?\d{8})\s*(?P<desc>.*?)\s*(?P<qty>(?:\d{1,3},)*\d+(?:\.\d{1,2})?)\s*CU\s*(?P<price>(?:\d{1,3},)*\d+(?:\.\d{2})?)\s*(?P<amount>(?:\d{1,3},)*\d+(?:\.\d{2})?)"
    )
    .unwrap();
}

fn grammar() -> LineGrammar {
    LineGrammar::new(LINE.clone())
}

/// Scan one document's text lines into header fields and entries.
pub fn parse_lines(file_name: &str, lines: &[String]) -> Result<InvoiceDocument> {
    let grammar = grammar();
    let mut invoice_number = HeaderSlot::default();
    let mut invoice_date = HeaderSlot::default();
    let mut subcon = HeaderSlot::default();
    let mut location = HeaderSlot::default();
    let mut printed_subtotal: Option<Decimal> = None;
    let mut entries: Vec<LineItemEntry> = Vec::new();

    for line in lines {
        invoice_number.scan(&INVOICE_NO, line);

        if !invoice_date.is_filled() {
            if let Some(caps) = INVOICE_DATE.captures(line) {
                if let Ok(date) = dates::parse_dmy(&caps[1]) {
                    invoice_date.fill(dates::display_date(date));
                }
            }
        }

        if let Some(caps) = LOC_SUBCON.captures(line) {
            subcon.fill(caps["subcon"].trim().to_uppercase());
            location.fill(caps["location"].trim().to_string());
        }

        if let Some(raw) = grammar.match_line(line) {
            let mut entry = raw.into_entry()?;
            entry.do_number = entry.do_number.replace(' ', "").to_uppercase();
            entries.push(entry);
            continue;
        }

        let upper = line.to_uppercase();
        if upper.contains("UNDERLOAD CHARGES") {
            if let Some(previous) = entries.last() {
                let rate = numbers::parse_decimal(
                    "underload rate",
                    line.split_whitespace().last().unwrap_or_default(),
                )?;
                let surcharge = surcharge_entry_with_rate(previous, rate);
                entries.push(surcharge);
            }
        }

        if upper.contains("SUB-TOTAL") && printed_subtotal.is_none() {
            if let Some(token) = line.split_whitespace().last() {
                printed_subtotal = numbers::parse_decimal("subtotal", token).ok();
            }
        }
    }

    debug!("{}: {} line items", file_name, entries.len());

    Ok(InvoiceDocument {
        file_name: file_name.to_string(),
        header: HeaderFields {
            invoice_number: invoice_number.take(),
            invoice_date: invoice_date.take(),
            subcon: subcon.take(),
            location: location.take(),
            building: None,
            printed_subtotal,
        },
        entries,
    })
}

/// One output row, fields in [`COLUMNS`] order. Rows are assembled by
/// name and serialized to cells only when pushed, so a field can never
/// land in the wrong column.
#[derive(Default)]
struct AcsRow {
    invoice_number: Cell,
    invoice_date: Cell,
    agg_description: Cell,
    agg_quantity: Cell,
    agg_unit: Cell,
    agg_unit_rate: Cell,
    agg_subtotal: Cell,
    total_amount: Cell,
    for_month: Cell,
    zone: Cell,
    contact_name: Cell,
    contact_number: Cell,
    pile_location: Cell,
    size: Cell,
    subcon: Cell,
    do_date: Cell,
    do_number: Cell,
    description: Cell,
    code1: Cell,
    code2: Cell,
    code3: Cell,
    code4: Cell,
    quantity: Cell,
    amount: Cell,
}

impl AcsRow {
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
            self.for_month,
            self.zone,
            self.contact_name,
            self.contact_number,
            self.pile_location,
            self.size,
            self.subcon,
            self.do_date,
            self.do_number,
            self.description,
            self.code1,
            self.code2,
            self.code3,
            self.code4,
            self.quantity,
            self.amount,
        ]
    }
}

/// Assemble one document block: N entry rows with the K-row aggregate
/// view overlaid on the leading rows.
pub fn document_block(doc: &InvoiceDocument) -> Result<FileBlock> {
    let aggregates = DescriptionAggregates::from_entries(&doc.entries);
    let subcon = doc.header.subcon.clone().unwrap_or_default();
    let zone = decode::zone_for(&subcon);

    let mut table = OutputTable::new(COLUMNS.to_vec());
    for (i, entry) in doc.entries.iter().enumerate() {
        let code = decode::decode_acs(&entry.description);

        let mut row = AcsRow::default();
        if i == 0 {
            row.invoice_number = Cell::opt_text(doc.header.invoice_number.clone());
            row.invoice_date = Cell::opt_text(doc.header.invoice_date.clone());
            row.total_amount = Cell::opt_number(doc.header.printed_subtotal);
        }
        if let Some(agg) = aggregates.get(i) {
            row.agg_description = Cell::text(agg.description.clone());
            row.agg_quantity = Cell::Number(agg.total_quantity);
            row.agg_unit = Cell::text(agg.unit);
            row.agg_unit_rate = Cell::Number(agg.unit_price);
            row.agg_subtotal = Cell::Number(agg.subtotal());
        }
        row.for_month = Cell::text(entry.for_month.clone());
        row.zone = Cell::text(zone.clone());
        row.subcon = Cell::text(subcon.clone());
        row.do_date = Cell::text(entry.delivery_date.clone());
        row.do_number = Cell::text(entry.do_number.clone());
        row.description = Cell::text(entry.description.clone());
        row.code3 = Cell::opt_text(code.retardant);
        row.code4 = Cell::opt_text(code.duration);
        row.quantity = Cell::Number(entry.quantity);
        row.amount = Cell::opt_number(entry.amount);
        table.push_row(row.into_cells());
    }

    let mut block = FileBlock::new(table);
    block.subtotal_discrepancy = aggregates.discrepancy(doc.header.printed_subtotal);
    Ok(block)
}

pub struct AcsPipeline;

impl VendorPipeline for AcsPipeline {
    fn columns(&self) -> &'static [&'static str] {
        COLUMNS
    }

    fn process_file(&self, path: &Path) -> Result<FileBlock> {
        let text = pdf::extract_page_lines(path)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let file_name = file_name_of(path);
        let doc = parse_lines(&file_name, &lines)?;
        document_block(&doc)
    }

    fn load_annotations(&self, sheet: &Path) -> Result<AnnotationTable> {
        Ok(AnnotationTable::from_acs_sheet(sheet)?)
    }

    fn apply_annotations(&self, table: &mut OutputTable, annotations: &AnnotationTable) {
        fill_annotation_columns(
            table,
            annotations,
            "DO No.",
            &[
                ("Purchaser Personnel Name", |r| r.contact_name.as_ref()),
                ("Purchaser Personnel Contact", |r| r.contact_number.as_ref()),
                ("Bored Pile No.: OR Location ***", |r| r.location.as_ref()),
            ],
        );
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_end_to_end_single_line_item() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&[
                "INVOICE NO: 123456",
                "DATE: 01/02/2024",
                "01/02/2024 AB12345678 READY MIX 10.0 CU 50.00 500.00",
            ]),
        )
        .unwrap();

        assert_eq!(doc.header.invoice_number.as_deref(), Some("123456"));
        assert_eq!(doc.header.invoice_date.as_deref(), Some("01 Feb 2024"));
        assert_eq!(doc.entries.len(), 1);
        let entry = &doc.entries[0];
        assert_eq!(entry.for_month, "2024 02");
        assert_eq!(entry.quantity, dec!(10.0));
        assert_eq!(entry.unit_price, dec!(50.00));
        assert_eq!(entry.do_number, "AB12345678");

        // 1 entry row; the batch layer appends the blank separator
        let block = document_block(&doc).unwrap();
        assert_eq!(block.table.len(), 1);
        assert_eq!(block.table.rows[0][0], Cell::text("123456"));
    }

    #[test]
    fn test_first_invoice_number_wins() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&["INVOICE NO: 123456", "INVOICE NO: 999999"]),
        )
        .unwrap();
        assert_eq!(doc.header.invoice_number.as_deref(), Some("123456"));
    }

    #[test]
    fn test_do_number_with_inner_space_normalized() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&["01/02/2024 AB 12345678 READY MIX 10.0 CU 50.00 500.00"]),
        )
        .unwrap();
        assert_eq!(doc.entries[0].do_number, "AB12345678");
    }

    #[test]
    fn test_literal_underload_line_synthesizes_row() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&[
                "01/02/2024 AB12345678 READY MIX 2.5 CU 95.00 237.50",
                "UNDERLOAD CHARGES 48.00",
            ]),
        )
        .unwrap();
        assert_eq!(doc.entries.len(), 2);
        let surcharge = &doc.entries[1];
        assert_eq!(surcharge.quantity, dec!(1));
        assert_eq!(surcharge.unit_price, dec!(48.00));
        assert_eq!(
            surcharge.description,
            "READY MIX - UNDERLOAD CHARGES - 2.5m3"
        );
        assert_eq!(surcharge.do_number, "AB12345678");
    }

    #[test]
    fn test_subtotal_and_subcon() {
        let doc = parse_lines(
            "inv.pdf",
            &lines(&[
                "Project @ MARINA VIEW - CSBP Contract No : 91234567",
                "01/02/2024 AB12345678 READY MIX 10.0 CU 50.00 500.00",
                "SUB-TOTAL 500.00",
            ]),
        )
        .unwrap();
        assert_eq!(doc.header.subcon.as_deref(), Some("CSBP"));
        assert_eq!(doc.header.printed_subtotal, Some(dec!(500.00)));

        let block = document_block(&doc).unwrap();
        assert_eq!(block.subtotal_discrepancy, None);
        let zone_idx = block.table.column_index("Zone").unwrap();
        assert_eq!(block.table.rows[0][zone_idx], Cell::text("A"));
    }

    #[test]
    fn test_aggregate_overlay_row_counts() {
        // 3 entries, 2 unique descriptions: aggregates only in rows 0..2
        let doc = parse_lines(
            "inv.pdf",
            &lines(&[
                "01/02/2024 AB12345678 READY MIX 10.0 CU 50.00 500.00",
                "02/02/2024 AB12345679 READY MIX 5.0 CU 50.00 250.00",
                "03/02/2024 AB12345680 SCREED 2.0 CU 80.00 160.00",
            ]),
        )
        .unwrap();
        let block = document_block(&doc).unwrap();
        assert_eq!(block.table.len(), 3);

        let desc_idx = block.table.column_index("Description").unwrap();
        let qty_idx = block.table.column_index("Total Qty").unwrap();
        assert_eq!(block.table.rows[0][desc_idx], Cell::text("READY MIX"));
        assert_eq!(block.table.rows[0][qty_idx], Cell::Number(dec!(15.0)));
        assert_eq!(block.table.rows[1][desc_idx], Cell::text("SCREED"));
        assert_eq!(block.table.rows[2][desc_idx], Cell::Empty);

        // per-entry columns populated in every row
        let do_idx = block.table.column_index("DO No.").unwrap();
        for row in &block.table.rows {
            assert!(!row[do_idx].is_empty());
        }
    }
}
